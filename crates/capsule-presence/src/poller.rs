//! Interval-driven presence polling.
//!
//! The poll loop runs in its own tokio task owned by [`PresencePoller`].
//! Each tick fetches both identities concurrently and applies each result
//! on its own as soon as it resolves.  A failed or negative fetch leaves
//! the previous snapshot on the board.

use std::sync::Arc;
use std::time::Duration;

use capsule_shared::IdentityId;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::board::PresenceBoard;
use crate::source::PresenceSource;

/// What one tick did for each identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Identities whose snapshot was replaced.
    pub updated: Vec<IdentityId>,
    /// Identities whose previous snapshot (or absence) was kept.
    pub retained: Vec<IdentityId>,
}

/// Fetch both identities once and apply the results to `board`.
pub async fn poll_once(
    source: &dyn PresenceSource,
    board: &PresenceBoard,
    identities: &[IdentityId; 2],
) -> TickReport {
    let [first, second] = identities;
    let (a, b) = futures::future::join(
        fetch_and_apply(source, board, first),
        fetch_and_apply(source, board, second),
    )
    .await;

    let mut report = TickReport::default();
    for (identity, updated) in [(first, a), (second, b)] {
        if updated {
            report.updated.push(identity.clone());
        } else {
            report.retained.push(identity.clone());
        }
    }
    report
}

async fn fetch_and_apply(
    source: &dyn PresenceSource,
    board: &PresenceBoard,
    identity: &IdentityId,
) -> bool {
    match source.fetch(identity).await {
        Ok(envelope) => match envelope.into_snapshot() {
            Some(snapshot) => {
                board.replace(identity.clone(), snapshot).await;
                true
            }
            None => {
                warn!(identity = %identity, "Presence service reported failure, keeping last snapshot");
                false
            }
        },
        Err(e) => {
            warn!(identity = %identity, error = %e, "Presence fetch failed, keeping last snapshot");
            false
        }
    }
}

struct PollTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the presence poll loop.
///
/// Dropping the poller aborts a running loop, so no timer outlives it.
pub struct PresencePoller {
    source: Arc<dyn PresenceSource>,
    board: PresenceBoard,
    task: Option<PollTask>,
}

impl PresencePoller {
    pub fn new(source: Arc<dyn PresenceSource>) -> Self {
        Self {
            source,
            board: PresenceBoard::new(),
            task: None,
        }
    }

    /// Shared handle to the snapshots this poller writes.
    pub fn board(&self) -> PresenceBoard {
        self.board.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    /// Start polling `identities` every `interval`, beginning immediately.
    ///
    /// A loop that is already running is replaced.  Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self, identities: [IdentityId; 2], interval: Duration) {
        if let Some(previous) = self.task.take() {
            debug!("Replacing running presence poller");
            let _ = previous.shutdown.send(());
            previous.handle.abort();
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let source = self.source.clone();
        let board = self.board.clone();

        info!(
            first = %identities[0],
            second = %identities[1],
            interval_ms = interval.as_millis() as u64,
            "Presence poller started"
        );

        let handle = tokio::spawn(run(source, board, identities, interval, shutdown_rx));
        self.task = Some(PollTask {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Stop the loop and wait for its task to finish.  No-op when idle.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let _ = task.shutdown.send(());
        if let Err(e) = task.handle.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Presence poller task ended abnormally");
            }
        }
        info!("Presence poller stopped");
    }
}

impl Drop for PresencePoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }
}

async fn run(
    source: Arc<dyn PresenceSource>,
    board: PresenceBoard,
    identities: [IdentityId; 2],
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    report = poll_once(source.as_ref(), &board, &identities) => {
                        debug!(
                            updated = report.updated.len(),
                            retained = report.retained.len(),
                            "Presence tick"
                        );
                    }
                }
            }
        }
    }

    debug!("Presence poll loop exited");
}
