//! Telemetry reconciliation and valve-control engine between `damwatch-api`
//! and front ends.
//!
//! - **[`Dashboard`]**: facade owning the lifecycle.
//!   [`start()`](Dashboard::start) spawns the poll loop,
//!   [`poll_once()`](Dashboard::poll_once) runs one tick for one-shot use.
//!
//! - **[`Poller`]**: fixed-cadence fetch → reconcile → publish with an
//!   in-flight guard (busy ticks are skipped) and cancellation on teardown.
//!
//! - **[`reconcile`]**: all-or-nothing merge of one tick's source results
//!   into an [`OperationalSnapshot`].
//!
//! - **[`derive`]**: pure functions from a snapshot to a [`DashboardView`]
//!   (clamped percentages, risk buckets, safety reasons, weather labels).
//!
//! - **[`SessionGate`]** / **[`CommandDispatcher`]**: persisted operator
//!   session, and admin-gated valve commands with no local side effects.

pub mod config;
pub mod dashboard;
pub mod derive;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod poller;
pub mod session;
pub mod snapshot;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CredentialPolicy, DashboardConfig, TlsVerification};
pub use dashboard::{Dashboard, LogEntries, LogKind};
pub use derive::{
    AlertLevel, ChartPoint, DashboardView, RainfallRisk, SafetyReason, ValveSummary,
    WaterSeverity, WeatherCondition, WeatherSummary,
};
pub use dispatch::CommandDispatcher;
pub use error::{CoreError, FetchError, ReconcileError};
pub use fetch::Source;
pub use poller::{PollPhase, PollStatus, Poller, StaleNotice, TickOutcome};
pub use session::{LocalStorage, Role, Session, SessionGate};
pub use snapshot::{OperationalSnapshot, PollResults, reconcile};
pub use stream::SnapshotStream;

// Wire types consumers see through snapshots.
pub use damwatch_api::{
    ControlAck, FetchFailure, Reading, ValveCommand, ValveControl, ValveMode, ValveState,
    ValveStatus, VibrationLog, WaterLevelLog, Weather,
};
