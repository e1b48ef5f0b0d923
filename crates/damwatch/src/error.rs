//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use damwatch_config::ConfigError;
use damwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the dam backend")]
    #[diagnostic(
        code(damwatch::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             {detail}\n\
             Override the URL with --api-url or DAMWATCH_API_URL."
        )
    )]
    ConnectionFailed { detail: String },

    #[error("{message}")]
    #[diagnostic(
        code(damwatch::stale),
        help("The backend answered, but at least one source failed. Run with -v for details.")
    )]
    Stale { message: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(damwatch::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Invalid credentials")]
    #[diagnostic(
        code(damwatch::auth_failed),
        help("Check the admin username and password in your config ([admin] section).")
    )]
    AuthFailed,

    #[error("{operation} requires an admin session")]
    #[diagnostic(code(damwatch::permission_denied), help("Log in first: damwatch login"))]
    PermissionDenied { operation: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Valve command failed: {message}")]
    #[diagnostic(
        code(damwatch::command_failed),
        help("The command was not retried. The valve state shown by `damwatch status` is authoritative.")
    )]
    CommandFailed { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(damwatch::api_error))]
    ApiError { message: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(damwatch::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(damwatch::config),
        help("Inspect the effective settings with: damwatch config show")
    )]
    Config { message: String },

    #[error("Session storage error: {message}")]
    #[diagnostic(code(damwatch::storage))]
    Storage { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(damwatch::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_unreachable() {
            return Self::ConnectionFailed {
                detail: err.to_string(),
            };
        }
        match err {
            CoreError::InvalidCredentials => Self::AuthFailed,
            CoreError::Unauthorized { operation } => Self::PermissionDenied { operation },
            CoreError::Reconcile(e) => Self::Stale {
                message: e.to_string(),
            },
            CoreError::Fetch(e) => Self::ApiError {
                message: e.to_string(),
            },
            CoreError::Dispatch { message } => Self::CommandFailed { message },
            CoreError::Api { message, .. } => Self::ApiError { message },
            CoreError::Storage { path, reason } => Self::Storage {
                message: format!("{path}: {reason}"),
            },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Stopped => Self::ApiError {
                message: "dashboard stopped".into(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use damwatch_core::{FetchError, FetchFailure, ReconcileError, Source};

    fn reconcile(kinds: &[(Source, FetchFailure)]) -> CoreError {
        CoreError::Reconcile(ReconcileError {
            failures: kinds
                .iter()
                .map(|&(endpoint, kind)| FetchError {
                    endpoint,
                    kind,
                    message: "boom".into(),
                })
                .collect(),
        })
    }

    #[test]
    fn session_errors_have_distinct_exit_codes() {
        assert_eq!(CliError::from(CoreError::InvalidCredentials).exit_code(), 3);
        let denied = CliError::from(CoreError::Unauthorized {
            operation: "valve control".into(),
        });
        assert_eq!(denied.exit_code(), 5);
    }

    #[test]
    fn all_transport_failures_mean_unreachable() {
        let err = reconcile(&[
            (Source::Readings, FetchFailure::Transport),
            (Source::Valve, FetchFailure::Transport),
        ]);
        assert_eq!(CliError::from(err).exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn partial_failures_are_stale_data() {
        let err = reconcile(&[
            (Source::Readings, FetchFailure::Transport),
            (Source::Weather, FetchFailure::Decode),
        ]);
        let cli = CliError::from(err);
        assert!(matches!(cli, CliError::Stale { .. }));
        assert_eq!(cli.exit_code(), exit_code::GENERAL);
    }
}
