use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time,
};
use tracing::{debug, info, warn};

use crate::{
    api::{BackendError, DashboardApi},
    models::VersionToken,
};

/// Cadence used when the caller does not pick one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(8);

/// Diagnostics emitted by a running poller.
#[derive(Debug)]
pub enum PollEvent {
    /// The token differs from the last one seen; `on_change` was invoked.
    Changed {
        /// Token seen on the previous successful poll.
        previous: VersionToken,
        /// Token just fetched.
        current: VersionToken,
    },
    /// A poll failed; the next one is scheduled as usual.
    Failed(BackendError),
}

/// Periodically checks the backend version token.
pub struct VersionPoller {
    api: Arc<dyn DashboardApi>,
    interval: Duration,
    diagnostics: Option<mpsc::Sender<PollEvent>>,
}

impl VersionPoller {
    /// Create a poller checking `api` every `interval`.
    pub fn new(api: Arc<dyn DashboardApi>, interval: Duration) -> Self {
        Self {
            api,
            interval,
            diagnostics: None,
        }
    }

    /// Report changes and failures on `sender`.
    ///
    /// Events are dropped when the channel is full; polling never waits on
    /// the observer.
    pub fn with_diagnostics(mut self, sender: mpsc::Sender<PollEvent>) -> Self {
        self.diagnostics = Some(sender);
        self
    }

    /// Spawn the polling loop on the current tokio runtime.
    ///
    /// The first successful poll only records the token. Each later poll
    /// whose token differs from the previous one calls `on_change` once.
    pub fn start<F>(self, on_change: F) -> PollerHandle
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(on_change, stop_rx));
        PollerHandle {
            stop_tx,
            task: Some(task),
        }
    }

    async fn run<F>(self, mut on_change: F, mut stop_rx: watch::Receiver<bool>)
    where
        F: FnMut() + Send + 'static,
    {
        info!(interval_ms = self.interval.as_millis() as u64, "Version polling started");
        let mut last_seen: Option<VersionToken> = None;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = stopped(&mut stop_rx) => break,
                outcome = self.api.version() => outcome,
            };
            if *stop_rx.borrow() {
                break;
            }

            match outcome {
                Ok(current) => {
                    match last_seen.take() {
                        Some(previous) if previous != current => {
                            info!(%previous, %current, "Backend data changed");
                            on_change();
                            self.emit(PollEvent::Changed {
                                previous,
                                current: current.clone(),
                            });
                        }
                        Some(_) => {}
                        None => debug!(%current, "Recorded initial version"),
                    }
                    last_seen = Some(current);
                }
                Err(err) => {
                    warn!(error = %err, "Version poll failed");
                    self.emit(PollEvent::Failed(err));
                }
            }

            tokio::select! {
                biased;
                _ = stopped(&mut stop_rx) => break,
                _ = time::sleep(self.interval) => {}
            }
        }

        debug!("Version polling stopped");
    }

    fn emit(&self, event: PollEvent) {
        if let Some(sender) = &self.diagnostics {
            if sender.try_send(event).is_err() {
                debug!("Poll diagnostic dropped");
            }
        }
    }
}

async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    while !*stop_rx.borrow_and_update() {
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Owns a running poller. Dropping the handle cancels it.
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Signal the loop to stop without waiting.
    ///
    /// A pending timer is cancelled and an in-flight version fetch is
    /// discarded. A callback already running finishes; use [`Self::stop`] to
    /// wait for that.
    pub fn cancel(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Stop the loop and wait for it to exit. Once this returns `on_change`
    /// is never invoked again.
    pub async fn stop(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if err.is_panic() {
                    warn!("Version poller panicked: {err}");
                }
            }
        }
    }

    /// Whether the polling loop is still alive.
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
