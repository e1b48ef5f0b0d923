// ── Core error types ──
//
// User-facing errors from damwatch-core. Fetch failures keep the api
// crate's transport / protocol / decode classification but are always
// tagged with the source that failed, so a failed poll can say which
// endpoint let it down.

use thiserror::Error;

use damwatch_api::FetchFailure;

use crate::fetch::Source;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    /// Identity or secret did not match. Deliberately does not say which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authorized: {operation} requires an admin session")]
    Unauthorized { operation: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Valve command failed: {message}")]
    Dispatch { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Local state errors ───────────────────────────────────────────
    #[error("Session storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Dashboard stopped")]
    Stopped,
}

impl CoreError {
    /// Whether this is an authentication or authorization failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::Unauthorized { .. })
    }

    /// Whether the backend could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.kind == FetchFailure::Transport,
            Self::Reconcile(e) => e
                .failures
                .iter()
                .all(|f| f.kind == FetchFailure::Transport),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<damwatch_api::Error> for CoreError {
    fn from(err: damwatch_api::Error) -> Self {
        match err {
            damwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            damwatch_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            other => CoreError::Api {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

// ── Fetch / reconcile errors ─────────────────────────────────────────

/// One source failed to produce a value this tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{endpoint} fetch failed ({kind}): {message}")]
pub struct FetchError {
    pub endpoint: Source,
    pub kind: FetchFailure,
    pub message: String,
}

impl FetchError {
    pub fn from_api(endpoint: Source, err: &damwatch_api::Error) -> Self {
        Self {
            endpoint,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn timed_out(endpoint: Source, after: std::time::Duration) -> Self {
        Self {
            endpoint,
            kind: FetchFailure::Transport,
            message: format!("no response within {}ms", after.as_millis()),
        }
    }
}

/// A poll could not be reconciled because at least one source failed.
///
/// Carries every failure from the tick, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("data may be stale: {}", describe(.failures))]
pub struct ReconcileError {
    pub failures: Vec<FetchError>,
}

impl ReconcileError {
    /// The sources that failed, in order.
    pub fn sources(&self) -> Vec<Source> {
        self.failures.iter().map(|f| f.endpoint).collect()
    }
}

fn describe(failures: &[FetchError]) -> String {
    let parts: Vec<String> = failures
        .iter()
        .map(|f| format!("{} ({})", f.endpoint, f.kind))
        .collect();
    format!("{} failed", parts.join(", "))
}
