//! Staleness detection and data refresh.

/// Concurrent games/stats loading into a shared snapshot.
pub mod fetcher;
/// Version polling with guaranteed teardown.
pub mod poller;

pub use fetcher::{DashboardState, DataFetcher, LoadStatus};
pub use poller::{PollEvent, PollerHandle, VersionPoller, DEFAULT_POLL_INTERVAL};
