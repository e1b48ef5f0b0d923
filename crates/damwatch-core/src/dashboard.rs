// ── Dashboard facade ──
//
// Lifecycle and entry point for consumers: session, polling, derived
// view, valve dispatch, and the admin log views.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use damwatch_api::{
    ControlAck, DamClient, Reading, ValveCommand, ValveMode, VibrationLog, WaterLevelLog,
};

use crate::config::DashboardConfig;
use crate::derive::DashboardView;
use crate::dispatch::CommandDispatcher;
use crate::error::CoreError;
use crate::fetch::{Source, fetch_source};
use crate::poller::{PollStatus, Poller, TickOutcome};
use crate::session::{LocalStorage, Session, SessionGate};
use crate::snapshot::OperationalSnapshot;
use crate::stream::SnapshotStream;

// ── Log views ────────────────────────────────────────────────────────

/// Which historical log to show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum LogKind {
    WaterLevel,
    Vibration,
    /// Temperature and humidity, from the readings feed.
    Env,
    /// Rainfall probability, from the readings feed.
    Rainfall,
    All,
}

impl LogKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::WaterLevel => "Water Level Log",
            Self::Vibration => "Vibration Log",
            Self::Env => "Temperature & Humidity Log",
            Self::Rainfall => "Rainfall Log",
            Self::All => "All Readings",
        }
    }

    fn source(self) -> Source {
        match self {
            Self::WaterLevel => Source::WaterLevelLog,
            Self::Vibration => Source::VibrationLog,
            Self::Env | Self::Rainfall | Self::All => Source::Readings,
        }
    }
}

/// Rows of one log view, newest first as the backend sends them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogEntries {
    WaterLevel(Vec<WaterLevelLog>),
    Vibration(Vec<VibrationLog>),
    Readings(Vec<Reading>),
}

impl LogEntries {
    pub fn len(&self) -> usize {
        match self {
            Self::WaterLevel(rows) => rows.len(),
            Self::Vibration(rows) => rows.len(),
            Self::Readings(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Dashboard ────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<DashboardInner>`. [`start()`](Self::start)
/// spawns the background poll loop; [`poll_once()`](Self::poll_once)
/// runs a single tick for one-shot use.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    client: DamClient,
    session: Arc<SessionGate>,
    poller: Arc<Poller>,
    dispatcher: CommandDispatcher,
    cancel: CancellationToken,
    /// Child token for the current run; cancelled on stop, replaced on start.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Build the client and restore any persisted session. Does not poll;
    /// call [`start()`](Self::start) or [`poll_once()`](Self::poll_once).
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let client = DamClient::new(config.api_url.clone(), &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    /// Use a pre-built client (tests point this at a mock server).
    pub fn with_client(config: DashboardConfig, client: DamClient) -> Self {
        let session = Arc::new(SessionGate::restore(
            config.credentials.clone(),
            LocalStorage::new(config.session_path.clone()),
        ));
        let poller = Arc::new(Poller::new(
            client.clone(),
            config.fetch_timeout,
            config.history_capacity,
        ));
        let dispatcher = CommandDispatcher::new(client.clone(), Arc::clone(&session));
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(DashboardInner {
                config,
                client,
                session,
                poller,
                dispatcher,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    // ── Session ──────────────────────────────────────────────────────

    pub fn login(&self, identity: &str, secret: &str) -> Result<Session, CoreError> {
        self.inner.session.authenticate(identity, secret)
    }

    pub fn logout(&self) -> Result<(), CoreError> {
        self.inner.session.end_session()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.inner.session.current_session()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the poll loop. The first tick fires immediately.
    ///
    /// Calling `start()` on a running dashboard restarts the loop.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Stopped);
        }
        self.stop().await;

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let poller = Arc::clone(&self.inner.poller);
        let interval = self.inner.config.poll_interval;
        let handle = tokio::spawn(poller.run(interval, child));
        self.inner.task_handles.lock().await.push(handle);

        info!(
            api_url = %self.inner.config.api_url,
            interval_ms = interval.as_millis(),
            "dashboard started"
        );
        Ok(())
    }

    /// Cancel the poll loop and wait for it to wind down. A poll still in
    /// flight is abandoned without publishing.
    pub async fn stop(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("dashboard stopped");
    }

    /// Stop for good; later `start()` calls fail with `Stopped`.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.stop().await;
    }

    /// Run a single poll tick now.
    pub async fn poll_once(&self) -> TickOutcome {
        let cancel = self.inner.cancel_child.lock().await.clone();
        self.inner.poller.tick(&cancel).await
    }

    /// Poll once and return the resulting snapshot, or the reason there
    /// is no fresh one.
    pub async fn refresh(&self) -> Result<Arc<OperationalSnapshot>, CoreError> {
        match self.poll_once().await {
            TickOutcome::Published(_) | TickOutcome::Skipped => Ok(self.snapshot()),
            TickOutcome::Failed(err) => Err(CoreError::Reconcile(err)),
            TickOutcome::Cancelled => Err(CoreError::Stopped),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<OperationalSnapshot> {
        self.inner.poller.snapshot()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.poller.subscribe())
    }

    /// Derived view of the current snapshot.
    pub fn view(&self) -> DashboardView {
        DashboardView::derive(&self.snapshot())
    }

    pub fn poll_status(&self) -> watch::Receiver<PollStatus> {
        self.inner.poller.status()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn dispatch(
        &self,
        mode: ValveMode,
        command: ValveCommand,
    ) -> Result<ControlAck, CoreError> {
        self.inner.dispatcher.dispatch(mode, command).await
    }

    /// Fetch one historical log. Admin only.
    pub async fn logs(&self, kind: LogKind) -> Result<LogEntries, CoreError> {
        if !self.inner.session.is_admin() {
            return Err(CoreError::Unauthorized {
                operation: format!("{} view", kind.title()),
            });
        }

        let client = &self.inner.client;
        let timeout = self.inner.config.timeout;
        let source = kind.source();
        debug!(%kind, %source, "fetching log view");

        let entries = match kind {
            LogKind::WaterLevel => {
                LogEntries::WaterLevel(fetch_source(source, timeout, client.water_level_logs()).await?)
            }
            LogKind::Vibration => {
                LogEntries::Vibration(fetch_source(source, timeout, client.vibration_logs()).await?)
            }
            LogKind::Env | LogKind::Rainfall | LogKind::All => {
                LogEntries::Readings(fetch_source(source, timeout, client.readings()).await?)
            }
        };
        Ok(entries)
    }
}
