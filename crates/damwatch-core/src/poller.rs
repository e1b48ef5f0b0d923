// ── Poll scheduler ──
//
// Drives fetch → reconcile → publish on a fixed cadence.
//
//   Idle ──tick──▶ Polling ──all settled──▶ Reconciling ──▶ Idle
//                     │                          │
//                     └──────── cancelled        └─failure─▶ Failed ──▶ Idle
//
// At most one poll is in flight. A tick that finds the previous poll
// still running is skipped, never queued. Snapshot and status are
// separate watch channels; the snapshot is swapped as one `Arc`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use damwatch_api::DamClient;

use crate::error::ReconcileError;
use crate::fetch::{Source, fetch_all};
use crate::snapshot::{OperationalSnapshot, reconcile};

// ── Status types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
    Reconciling,
    Failed,
}

/// The single "data may be stale" banner.
///
/// Raised by a failed poll and cleared by the next successful one.
/// Repeated failures update the message but keep `since`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleNotice {
    pub message: String,
    pub failed_sources: Vec<Source>,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollStatus {
    pub phase: PollPhase,
    pub stale: Option<StaleNotice>,
    /// Generation of the snapshot currently published (0 = none yet).
    pub last_success_generation: u64,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new snapshot with this generation was published.
    Published(u64),
    /// At least one source failed; the previous snapshot stays.
    Failed(ReconcileError),
    /// Another poll was already in flight.
    Skipped,
    /// Teardown happened before the poll could publish.
    Cancelled,
}

// ── In-flight guard ──────────────────────────────────────────────────

/// Holds the in-flight flag; releases it on drop, including when the
/// owning future is abandoned mid-poll.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Poller ───────────────────────────────────────────────────────────

pub struct Poller {
    client: DamClient,
    fetch_timeout: Duration,
    history_capacity: usize,
    in_flight: AtomicBool,
    snapshot_tx: watch::Sender<Arc<OperationalSnapshot>>,
    status_tx: watch::Sender<PollStatus>,
}

impl Poller {
    pub fn new(client: DamClient, fetch_timeout: Duration, history_capacity: usize) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(OperationalSnapshot::default()));
        let (status_tx, _) = watch::channel(PollStatus::default());
        Self {
            client,
            fetch_timeout,
            history_capacity,
            in_flight: AtomicBool::new(false),
            snapshot_tx,
            status_tx,
        }
    }

    /// The snapshot currently published.
    pub fn snapshot(&self) -> Arc<OperationalSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<OperationalSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<PollStatus> {
        self.status_tx.subscribe()
    }

    /// Whether a poll is in flight right now.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: PollPhase) {
        self.status_tx.send_modify(|s| s.phase = phase);
    }

    /// Run one poll: fetch all sources, reconcile, publish.
    ///
    /// Nothing is published once `cancel` has fired, even if the fetches
    /// already completed.
    pub async fn tick(&self, cancel: &CancellationToken) -> TickOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("poll still in flight, skipping tick");
            return TickOutcome::Skipped;
        };

        self.set_phase(PollPhase::Polling);
        let results = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                self.set_phase(PollPhase::Idle);
                return TickOutcome::Cancelled;
            }
            results = fetch_all(&self.client, self.fetch_timeout) => results,
        };

        self.set_phase(PollPhase::Reconciling);
        let previous = self.snapshot();
        let outcome = reconcile(&previous, results, self.history_capacity);

        if cancel.is_cancelled() {
            debug!("poll settled after teardown, discarding");
            self.set_phase(PollPhase::Idle);
            return TickOutcome::Cancelled;
        }

        match outcome {
            Ok(next) => {
                let generation = next.generation;
                self.snapshot_tx.send_replace(Arc::new(next));
                self.status_tx.send_replace(PollStatus {
                    phase: PollPhase::Idle,
                    stale: None,
                    last_success_generation: generation,
                });
                debug!(generation, "snapshot published");
                TickOutcome::Published(generation)
            }
            Err(err) => {
                warn!(error = %err, "poll failed, keeping previous snapshot");
                let notice = StaleNotice {
                    message: err.to_string(),
                    failed_sources: err.sources(),
                    since: Utc::now(),
                };
                self.status_tx.send_modify(|s| {
                    s.phase = PollPhase::Failed;
                    s.stale = Some(match s.stale.take() {
                        Some(existing) => StaleNotice {
                            since: existing.since,
                            ..notice
                        },
                        None => notice,
                    });
                });
                self.set_phase(PollPhase::Idle);
                TickOutcome::Failed(err)
            }
        }
    }

    /// Tick every `interval` until `cancel` fires.
    ///
    /// Each poll runs as its own task so the timer keeps its cadence; the
    /// in-flight flag keeps polls from overlapping. On teardown the loop
    /// waits for the running poll to observe cancellation before returning.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut running: Option<JoinHandle<()>> = None;

        info!(interval_ms = interval.as_millis(), "poll loop started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.is_busy() {
                        debug!("previous poll still running, skipping tick");
                        continue;
                    }
                    let poller = Arc::clone(&self);
                    let cancel = cancel.clone();
                    running = Some(tokio::spawn(async move {
                        poller.tick(&cancel).await;
                    }));
                }
            }
        }

        if let Some(handle) = running.take() {
            let _ = handle.await;
        }
        info!("poll loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let guard = InFlight::acquire(&flag);
            assert!(guard.is_some());
            assert!(InFlight::acquire(&flag).is_none(), "second acquire must fail");
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[test]
    fn initial_status_is_idle_without_data() {
        let status = PollStatus::default();
        assert_eq!(status.phase, PollPhase::Idle);
        assert_eq!(status.stale, None);
        assert_eq!(status.last_success_generation, 0);
    }
}
