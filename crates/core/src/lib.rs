#![warn(clippy::all, missing_docs)]

//! Core logic for the game-log dashboard.
//!
//! This crate hosts the domain models, configuration handling, the
//! backend client, the staleness-detection poller, the snapshot fetcher
//! and the pure derivations that turn raw aggregates into chart series.
//! Frontends only consume what is exported here.

pub mod api;
pub mod config;
pub mod models;
pub mod refresh;
pub mod stats;

pub use api::{BackendError, DashboardApi, HttpBackend};
pub use config::AppConfig;
pub use models::{DeveloperScore, GameRecord, Snapshot, StatsAggregate, VersionToken};
pub use refresh::{DashboardState, DataFetcher, LoadStatus, PollEvent, PollerHandle, VersionPoller};
pub use stats::{ChartSeries, MetascoreBadge, MetascoreTier, SeriesPoint};
