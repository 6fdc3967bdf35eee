//! Backend client.

/// `reqwest` implementation of [`DashboardApi`].
pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{GameRecord, StatsAggregate, VersionToken};

pub use http::HttpBackend;

/// Read endpoints the dashboard consumes.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET /games`.
    async fn games(&self) -> Result<Vec<GameRecord>, BackendError>;
    /// `GET /stats`.
    async fn stats(&self) -> Result<StatsAggregate, BackendError>;
    /// `GET /version`.
    async fn version(&self) -> Result<VersionToken, BackendError>;
}

/// Failure talking to the backend.
///
/// Every variant is recoverable; callers keep their last good state and
/// retry on the next trigger.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection, timeout or body read failure.
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        /// Endpoint path, e.g. `/games`.
        endpoint: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("{endpoint}: unexpected status {status}")]
    Status {
        /// Endpoint path.
        endpoint: &'static str,
        /// Status returned.
        status: reqwest::StatusCode,
    },
    /// The body was not the expected JSON shape.
    #[error("{endpoint}: malformed response: {source}")]
    Malformed {
        /// Endpoint path.
        endpoint: &'static str,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The body parsed but violates a data invariant.
    #[error("{endpoint}: invalid response: {reason}")]
    Invalid {
        /// Endpoint path.
        endpoint: &'static str,
        /// What was wrong.
        reason: String,
    },
}

impl BackendError {
    /// Endpoint the failure belongs to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Malformed { endpoint, .. }
            | Self::Invalid { endpoint, .. } => endpoint,
        }
    }
}
