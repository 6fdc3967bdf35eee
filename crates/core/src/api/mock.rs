//! Scripted in-memory backend for tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{BackendError, DashboardApi};
use crate::models::{GameRecord, StatsAggregate, VersionToken};

/// Result queued for one call.
pub(crate) type Scripted<T> = Result<T, u16>;

/// Replies popped in order; the last reply repeats once the queue drains.
struct Script<T> {
    queue: VecDeque<Scripted<T>>,
    last: Option<Scripted<T>>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            last: None,
        }
    }

    fn next(&mut self) -> Option<Scripted<T>> {
        if let Some(reply) = self.queue.pop_front() {
            self.last = Some(reply.clone());
        }
        self.last.clone()
    }
}

fn status_error(endpoint: &'static str, code: u16) -> BackendError {
    BackendError::Status {
        endpoint,
        status: reqwest::StatusCode::from_u16(code)
            .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Gate that holds a call until released.
#[derive(Clone, Default)]
pub(crate) struct Gate(Arc<Notify>);

impl Gate {
    pub(crate) fn release(&self) {
        self.0.notify_one();
    }

    async fn wait(&self) {
        self.0.notified().await;
    }
}

#[derive(Default)]
struct Gates {
    games: VecDeque<Option<Gate>>,
    stats: VecDeque<Option<Gate>>,
    version: VecDeque<Option<Gate>>,
}

/// Backend whose replies are queued up front by the test.
pub(crate) struct ScriptedApi {
    games: Mutex<Script<Vec<GameRecord>>>,
    stats: Mutex<Script<StatsAggregate>>,
    versions: Mutex<Script<VersionToken>>,
    gates: Mutex<Gates>,
    games_calls: AtomicUsize,
    stats_calls: AtomicUsize,
    version_calls: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            games: Mutex::new(Script::new()),
            stats: Mutex::new(Script::new()),
            versions: Mutex::new(Script::new()),
            gates: Mutex::new(Gates::default()),
            games_calls: AtomicUsize::new(0),
            stats_calls: AtomicUsize::new(0),
            version_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn push_games(&self, reply: Scripted<Vec<GameRecord>>) {
        self.games.lock().queue.push_back(reply);
        self.gates.lock().games.push_back(None);
    }

    pub(crate) fn push_stats(&self, reply: Scripted<StatsAggregate>) {
        self.stats.lock().queue.push_back(reply);
        self.gates.lock().stats.push_back(None);
    }

    pub(crate) fn push_version(&self, reply: Scripted<&str>) {
        self.versions
            .lock()
            .queue
            .push_back(reply.map(|token| VersionToken::new(token)));
        self.gates.lock().version.push_back(None);
    }

    /// Queue a games reply that is only delivered once the gate opens.
    pub(crate) fn push_games_gated(&self, reply: Scripted<Vec<GameRecord>>) -> Gate {
        let gate = Gate::default();
        self.games.lock().queue.push_back(reply);
        self.gates.lock().games.push_back(Some(gate.clone()));
        gate
    }

    /// Queue a stats reply that is only delivered once the gate opens.
    pub(crate) fn push_stats_gated(&self, reply: Scripted<StatsAggregate>) -> Gate {
        let gate = Gate::default();
        self.stats.lock().queue.push_back(reply);
        self.gates.lock().stats.push_back(Some(gate.clone()));
        gate
    }

    /// Queue a version reply that is only delivered once the gate opens.
    pub(crate) fn push_version_gated(&self, reply: Scripted<&str>) -> Gate {
        let gate = Gate::default();
        self.versions
            .lock()
            .queue
            .push_back(reply.map(|token| VersionToken::new(token)));
        self.gates.lock().version.push_back(Some(gate.clone()));
        gate
    }

    pub(crate) fn games_calls(&self) -> usize {
        self.games_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DashboardApi for ScriptedApi {
    async fn games(&self) -> Result<Vec<GameRecord>, BackendError> {
        self.games_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().games.pop_front().flatten();
        let reply = self.games.lock().next();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        reply
            .unwrap_or_else(|| Ok(Vec::new()))
            .map_err(|code| status_error("/games", code))
    }

    async fn stats(&self) -> Result<StatsAggregate, BackendError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().stats.pop_front().flatten();
        let reply = self.stats.lock().next();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        reply
            .unwrap_or_else(|| Ok(StatsAggregate::default()))
            .map_err(|code| status_error("/stats", code))
    }

    async fn version(&self) -> Result<VersionToken, BackendError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().version.pop_front().flatten();
        let reply = self.versions.lock().next();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        reply
            .unwrap_or_else(|| Ok(VersionToken::new("initial")))
            .map_err(|code| status_error("/version", code))
    }
}
