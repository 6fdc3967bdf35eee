use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{BackendError, DashboardApi};
use crate::{
    config::AppConfig,
    models::{GameRecord, StatsAggregate, VersionResponse, VersionToken},
};

const GAMES: &str = "/games";
const STATS: &str = "/stats";
const VERSION: &str = "/version";
const HEALTH: &str = "/health";

static MONTH_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("invalid month key regex"));

/// Client for the game-log backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: String,
}

impl HttpBackend {
    /// Build a client rooted at `base` with a per-request timeout.
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gamelog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.api_base.clone(), config.request_timeout())
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Probe `GET /health`.
    pub async fn health(&self) -> Result<(), BackendError> {
        self.fetch_bytes(HEALTH).await.map(|_| ())
    }

    async fn fetch_bytes(&self, endpoint: &'static str) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}{}", self.base, endpoint);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status { endpoint, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| BackendError::Transport { endpoint, source })?;
        Ok(body.to_vec())
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
    ) -> Result<T, BackendError> {
        let body = self.fetch_bytes(endpoint).await?;
        decode(endpoint, &body)
    }
}

#[async_trait]
impl DashboardApi for HttpBackend {
    async fn games(&self) -> Result<Vec<GameRecord>, BackendError> {
        let games: Vec<GameRecord> = self.fetch_json(GAMES).await?;
        validate_games(&games)?;
        Ok(games)
    }

    async fn stats(&self) -> Result<StatsAggregate, BackendError> {
        let stats: StatsAggregate = self.fetch_json(STATS).await?;
        validate_stats(&stats)?;
        Ok(stats)
    }

    async fn version(&self) -> Result<VersionToken, BackendError> {
        let response: VersionResponse = self.fetch_json(VERSION).await?;
        if response.version.as_str().trim().is_empty() {
            return Err(BackendError::Invalid {
                endpoint: VERSION,
                reason: "empty version token".to_string(),
            });
        }
        Ok(response.version)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(body).map_err(|source| {
        warn!(endpoint, error = %source, "Backend sent an unexpected payload");
        BackendError::Malformed { endpoint, source }
    })
}

pub(crate) fn validate_games(games: &[GameRecord]) -> Result<(), BackendError> {
    let mut seen = HashSet::with_capacity(games.len());
    for game in games {
        if !seen.insert(game.idx) {
            return Err(BackendError::Invalid {
                endpoint: GAMES,
                reason: format!("duplicate idx {}", game.idx),
            });
        }
        if let Some(score) = game.metascore.filter(|score| *score > 100) {
            return Err(BackendError::Invalid {
                endpoint: GAMES,
                reason: format!("metascore {score} out of range for idx {}", game.idx),
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_stats(stats: &StatsAggregate) -> Result<(), BackendError> {
    if let Some(key) = stats
        .month_counts
        .keys()
        .find(|key| !MONTH_KEY_RE.is_match(key))
    {
        return Err(BackendError::Invalid {
            endpoint: STATS,
            reason: format!("month key {key:?} is not YYYY-MM"),
        });
    }
    if let Some(dev) = stats
        .top_devs_by_metascore
        .iter()
        .find(|dev| !(0.0..=100.0).contains(&dev.avg_metascore))
    {
        return Err(BackendError::Invalid {
            endpoint: STATS,
            reason: format!(
                "average metascore {} out of range for {}",
                dev.avg_metascore, dev.developer
            ),
        });
    }
    Ok(())
}
