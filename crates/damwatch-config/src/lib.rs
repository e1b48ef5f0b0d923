//! Shared configuration for damwatch.
//!
//! A single TOML file plus `DAMWATCH_`-prefixed environment variables,
//! layered over built-in defaults, and translation to
//! `damwatch_core::DashboardConfig`. The CLI applies its flag overrides
//! on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use damwatch_core::{CredentialPolicy, DashboardConfig, TlsVerification};
use damwatch_core::config::{DEFAULT_ADMIN_IDENTITY, DEFAULT_ADMIN_SECRET, DEFAULT_API_URL};

/// Prefix of environment overrides; nested keys use `__`
/// (`DAMWATCH_ADMIN__USERNAME`).
pub const ENV_PREFIX: &str = "DAMWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Backend base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Per-source timeout inside a poll, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Readings kept for the chart.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Where the login session is kept. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_path: Option<PathBuf>,

    #[serde(default)]
    pub admin: AdminCredentials,

    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout: default_timeout(),
            fetch_timeout: default_fetch_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            history_capacity: default_history_capacity(),
            insecure: false,
            ca_cert: None,
            session_path: None,
            admin: AdminCredentials::default(),
            defaults: Defaults::default(),
        }
    }
}

/// The operator pair the session gate accepts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdminCredentials {
    #[serde(default = "default_admin_username")]
    pub username: String,

    /// Plaintext; prefer `DAMWATCH_ADMIN__PASSWORD`. Unset means the
    /// backend's stock password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_fetch_timeout() -> u64 {
    5
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_history_capacity() -> usize {
    20
}
fn default_admin_username() -> String {
    DEFAULT_ADMIN_IDENTITY.into()
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "damwatch", "damwatch")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "damwatch", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the persisted session.
pub fn default_session_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "damwatch", "session.json"]),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file just means defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

impl Config {
    /// Validate and build the core's `DashboardConfig`.
    pub fn to_dashboard_config(&self) -> Result<DashboardConfig, ConfigError> {
        let api_url = parse_api_url(&self.api_url)?;

        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than zero"));
        }
        if self.fetch_timeout == 0 {
            return Err(invalid("fetch_timeout", "must be greater than zero"));
        }
        if self.timeout == 0 {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", "must be at least 1"));
        }

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let credentials = CredentialPolicy::Static {
            identity: self.admin.username.clone(),
            secret: SecretString::from(
                self.admin
                    .password
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ADMIN_SECRET.into()),
            ),
        };

        let session_path = self
            .session_path
            .clone()
            .unwrap_or_else(default_session_path);

        let mut config = DashboardConfig::new(api_url, session_path);
        config.tls = tls;
        config.timeout = Duration::from_secs(self.timeout);
        config.fetch_timeout = Duration::from_secs(self.fetch_timeout);
        config.poll_interval = Duration::from_millis(self.poll_interval_ms);
        config.history_capacity = self.history_capacity;
        config.credentials = credentials;
        Ok(config)
    }
}

/// Parse a backend URL, accepting only http(s).
pub fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid("api_url", &format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(
            "api_url",
            &format!("expected an http or https URL, got scheme '{other}'"),
        )),
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}
