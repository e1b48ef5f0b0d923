// ── Runtime dashboard configuration ──
//
// These types describe how to reach the backend and how to run the poll
// loop. They never touch disk; damwatch-config (or a test) builds a
// `DashboardConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use damwatch_api::transport::{TlsMode, TransportConfig};

use crate::snapshot::DEFAULT_HISTORY_CAPACITY;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stock operator pair of the backend.
pub const DEFAULT_ADMIN_IDENTITY: &str = "admin";
pub const DEFAULT_ADMIN_SECRET: &str = "admin123";

/// Operator credentials accepted by the session gate.
#[derive(Debug, Clone)]
pub enum CredentialPolicy {
    /// A single fixed identity / secret pair.
    Static {
        identity: String,
        secret: SecretString,
    },
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self::Static {
            identity: DEFAULT_ADMIN_IDENTITY.into(),
            secret: SecretString::from(DEFAULT_ADMIN_SECRET),
        }
    }
}

impl CredentialPolicy {
    /// Check both fields; the result never reveals which one was wrong.
    pub fn verify(&self, identity: &str, secret: &str) -> bool {
        match self {
            Self::Static {
                identity: expected_identity,
                secret: expected_secret,
            } => {
                let identity_ok = identity == expected_identity;
                let secret_ok = secret == expected_secret.expose_secret();
                identity_ok && secret_ok
            }
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed site gateways).
    DangerAcceptInvalid,
}

/// Everything the engine needs to run against one backend.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend base URL (e.g. `http://localhost:5000`).
    pub api_url: Url,
    pub tls: TlsVerification,
    /// Overall HTTP request timeout.
    pub timeout: Duration,
    /// Per-source bound inside a poll tick.
    pub fetch_timeout: Duration,
    pub poll_interval: Duration,
    pub history_capacity: usize,
    pub credentials: CredentialPolicy,
    /// JSON file holding the persisted session.
    pub session_path: PathBuf,
}

impl DashboardConfig {
    /// A config with default tuning for `api_url`, persisting the session
    /// at `session_path`.
    pub fn new(api_url: Url, session_path: impl Into<PathBuf>) -> Self {
        Self {
            api_url,
            tls: TlsVerification::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            credentials: CredentialPolicy::default(),
            session_path: session_path.into(),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
