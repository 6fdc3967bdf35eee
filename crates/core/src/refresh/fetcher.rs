use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{
    api::{BackendError, DashboardApi},
    models::{Snapshot, StatsAggregate},
};

/// Coarse state of the dashboard data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No cycle has succeeded or failed yet.
    NotLoaded,
    /// The latest applied cycle succeeded.
    Ready,
    /// The latest applied cycle failed; any snapshot shown is stale.
    Unreachable,
}

/// Read-only view of the fetcher state handed to presentation code.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Last good snapshot, kept across failed cycles.
    pub snapshot: Option<Arc<Snapshot>>,
    /// User-facing message set when the latest cycle failed.
    pub error: Option<String>,
    /// Whether any load is in flight.
    pub loading: bool,
}

impl DashboardState {
    /// Summarise the state for status lines.
    pub fn status(&self) -> LoadStatus {
        match (&self.error, &self.snapshot) {
            (Some(_), _) => LoadStatus::Unreachable,
            (None, Some(_)) => LoadStatus::Ready,
            (None, None) => LoadStatus::NotLoaded,
        }
    }

    /// Stats of the current snapshot, if any.
    pub fn stats(&self) -> Option<&StatsAggregate> {
        self.snapshot.as_deref().map(|snapshot| &snapshot.stats)
    }
}

/// Loads games and stats together and publishes them as one snapshot.
///
/// Cloning is cheap; clones share state, so the initial load and
/// poller-triggered reloads can run from different tasks.
#[derive(Clone)]
pub struct DataFetcher {
    api: Arc<dyn DashboardApi>,
    unreachable_message: Arc<str>,
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    snapshot: Option<Arc<Snapshot>>,
    error: Option<String>,
    in_flight: usize,
    issued: u64,
    applied: u64,
}

impl DataFetcher {
    /// Create a fetcher; `backend_label` names the backend in the error banner.
    pub fn new(api: Arc<dyn DashboardApi>, backend_label: &str) -> Self {
        Self {
            api,
            unreachable_message: format!("Backend API not reachable at {backend_label}").into(),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Current state.
    pub fn state(&self) -> DashboardState {
        let inner = self.inner.read();
        DashboardState {
            snapshot: inner.snapshot.clone(),
            error: inner.error.clone(),
            loading: inner.in_flight > 0,
        }
    }

    /// Fetch games and stats concurrently and publish the result.
    ///
    /// A failure of either call keeps the previous snapshot and sets the
    /// error flag. Results from a request that was overtaken by a newer one
    /// are returned to the caller but not published.
    pub async fn load(&self) -> Result<Arc<Snapshot>, BackendError> {
        let (seq, _loading) = self.begin();

        let result = tokio::try_join!(self.api.games(), self.api.stats())
            .map(|(games, stats)| Snapshot::new(games, stats));

        let mut inner = self.inner.write();
        if seq <= inner.applied {
            debug!(seq, applied = inner.applied, "Discarding stale load result");
            return result;
        }
        inner.applied = seq;

        match &result {
            Ok(snapshot) => {
                info!(seq, games = snapshot.games.len(), "Dashboard data refreshed");
                inner.snapshot = Some(snapshot.clone());
                inner.error = None;
            }
            Err(err) => {
                warn!(seq, error = %err, "Dashboard refresh failed; keeping previous data");
                inner.error = Some(self.unreachable_message.to_string());
            }
        }
        result
    }

    fn begin(&self) -> (u64, LoadingGuard) {
        let mut inner = self.inner.write();
        inner.issued += 1;
        inner.in_flight += 1;
        (
            inner.issued,
            LoadingGuard {
                inner: self.inner.clone(),
            },
        )
    }
}

/// Clears one unit of the loading indicator when dropped, whatever the
/// outcome of the load.
struct LoadingGuard {
    inner: Arc<RwLock<Inner>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.write();
        inner.in_flight = inner.in_flight.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::ScriptedApi;
    use crate::models::GameRecord;
    use std::time::Duration;
    use tokio::time;

    fn games(titles: &[&str]) -> Vec<GameRecord> {
        titles
            .iter()
            .enumerate()
            .map(|(idx, title)| GameRecord::new(idx as u32, *title))
            .collect()
    }

    fn stats_with_platform(platform: &str, count: u64) -> StatsAggregate {
        let mut stats = StatsAggregate::default();
        stats.platform_counts.insert(platform.to_string(), count);
        stats
    }

    fn fetcher(api: &Arc<ScriptedApi>) -> DataFetcher {
        let api: Arc<dyn DashboardApi> = api.clone();
        DataFetcher::new(api, "http://127.0.0.1:8000/api")
    }

    #[tokio::test]
    async fn starts_not_loaded() {
        let fetcher = fetcher(&ScriptedApi::new());
        let state = fetcher.state();
        assert_eq!(state.status(), LoadStatus::NotLoaded);
        assert!(!state.loading);
        assert!(state.stats().is_none());
    }

    #[tokio::test]
    async fn successful_load_publishes_snapshot() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        api.push_games(Ok(games(&["Hades", "Celeste"])));
        api.push_stats(Ok(stats_with_platform("Pc", 2)));
        let fetcher = fetcher(&api);

        let snapshot = fetcher.load().await?;
        let state = fetcher.state();

        assert_eq!(state.status(), LoadStatus::Ready);
        assert!(!state.loading);
        assert_eq!(snapshot.games.len(), 2);
        assert_eq!(state.stats().and_then(|s| s.platform_counts.get("Pc")), Some(&2));
        Ok(())
    }

    #[tokio::test]
    async fn failing_stats_keeps_previous_snapshot() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        api.push_games(Ok(games(&["Hades"])));
        api.push_stats(Ok(stats_with_platform("Pc", 1)));
        api.push_games(Ok(games(&["Hades", "Tunic"])));
        api.push_stats(Err(500));
        let fetcher = fetcher(&api);

        let first = fetcher.load().await?;
        assert!(fetcher.load().await.is_err());
        let state = fetcher.state();

        assert_eq!(state.status(), LoadStatus::Unreachable);
        assert_eq!(
            state.error.as_deref(),
            Some("Backend API not reachable at http://127.0.0.1:8000/api")
        );
        let kept = state.snapshot.expect("previous snapshot retained");
        assert!(Arc::ptr_eq(&kept, &first));
        assert_eq!(kept.games.len(), 1);
        assert!(!state.loading);
        Ok(())
    }

    #[tokio::test]
    async fn failing_games_keeps_previous_snapshot() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        api.push_games(Ok(games(&["Hades"])));
        api.push_stats(Ok(stats_with_platform("Pc", 1)));
        api.push_games(Err(502));
        api.push_stats(Ok(stats_with_platform("Ps5", 9)));
        let fetcher = fetcher(&api);

        let first = fetcher.load().await?;
        assert!(fetcher.load().await.is_err());
        let state = fetcher.state();

        assert_eq!(state.status(), LoadStatus::Unreachable);
        let kept = state.snapshot.expect("previous snapshot retained");
        assert!(Arc::ptr_eq(&kept, &first));
        assert!(kept.stats.platform_counts.get("Ps5").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn failure_before_any_success_has_no_snapshot() {
        let api = ScriptedApi::new();
        api.push_games(Err(503));
        let fetcher = fetcher(&api);

        assert!(fetcher.load().await.is_err());
        let state = fetcher.state();
        assert_eq!(state.status(), LoadStatus::Unreachable);
        assert!(state.snapshot.is_none());
    }

    #[tokio::test]
    async fn success_after_failure_clears_error() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        api.push_games(Err(503));
        api.push_games(Ok(games(&["Inside"])));
        let fetcher = fetcher(&api);

        assert!(fetcher.load().await.is_err());
        fetcher.load().await?;

        let state = fetcher.state();
        assert_eq!(state.status(), LoadStatus::Ready);
        assert!(state.error.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stats_request_is_issued_while_games_are_pending() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        let games_gate = api.push_games_gated(Ok(games(&["Hades", "Celeste"])));
        api.push_stats(Ok(stats_with_platform("Pc", 2)));
        let fetcher = fetcher(&api);

        let load = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.load().await }
        });
        time::sleep(Duration::from_millis(1)).await;

        assert_eq!(api.games_calls(), 1);
        assert_eq!(api.stats_calls(), 1);
        assert!(fetcher.state().snapshot.is_none());

        games_gate.release();
        let snapshot = load.await.expect("load task panicked")?;
        assert_eq!(snapshot.games.len(), 2);
        let published = fetcher.state().snapshot.expect("snapshot published");
        assert!(Arc::ptr_eq(&published, &snapshot));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn games_request_is_issued_while_stats_are_pending() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        api.push_games(Ok(games(&["Tunic"])));
        let stats_gate = api.push_stats_gated(Ok(stats_with_platform("Ps5", 1)));
        let fetcher = fetcher(&api);

        let load = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.load().await }
        });
        time::sleep(Duration::from_millis(1)).await;

        assert_eq!(api.stats_calls(), 1);
        assert_eq!(api.games_calls(), 1);
        assert!(fetcher.state().loading);

        stats_gate.release();
        load.await.expect("load task panicked")?;
        let state = fetcher.state();
        assert_eq!(state.status(), LoadStatus::Ready);
        assert_eq!(state.stats().and_then(|s| s.platform_counts.get("Ps5")), Some(&1));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn loading_flag_covers_overlapping_loads() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        let slow = api.push_games_gated(Ok(games(&["Slow"])));
        api.push_games(Ok(games(&["Fast"])));
        let fetcher = fetcher(&api);

        let first = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.load().await }
        });
        time::sleep(Duration::from_millis(1)).await;
        assert!(fetcher.state().loading);

        fetcher.load().await?;
        assert!(fetcher.state().loading, "slow load still in flight");

        slow.release();
        let _ = first.await;
        assert!(!fetcher.state().loading);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_never_overwrites_newer_snapshot() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        let slow = api.push_games_gated(Ok(games(&["Old"])));
        api.push_games(Ok(games(&["New", "Newer"])));
        let fetcher = fetcher(&api);

        let stale = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.load().await }
        });
        time::sleep(Duration::from_millis(1)).await;
        fetcher.load().await?;

        slow.release();
        let stale_result = stale.await.expect("load task panicked");
        assert_eq!(stale_result?.games[0].title, "Old");

        let state = fetcher.state();
        let snapshot = state.snapshot.expect("snapshot published");
        assert_eq!(snapshot.games.len(), 2);
        assert_eq!(snapshot.games[0].title, "New");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stale_failure_does_not_raise_the_banner() -> Result<(), BackendError> {
        let api = ScriptedApi::new();
        let slow = api.push_games_gated(Err(504));
        api.push_games(Ok(games(&["Fresh"])));
        let fetcher = fetcher(&api);

        let stale = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.load().await }
        });
        time::sleep(Duration::from_millis(1)).await;
        fetcher.load().await?;

        slow.release();
        assert!(stale.await.expect("load task panicked").is_err());
        assert_eq!(fetcher.state().status(), LoadStatus::Ready);
        Ok(())
    }
}
