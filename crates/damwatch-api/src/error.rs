use thiserror::Error;

/// How a request failed, from the caller's point of view.
///
/// Every [`Error`] collapses into one of these three buckets. The core
/// crate reports all of them as a single fetch failure but keeps the
/// bucket around for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum FetchFailure {
    /// No response arrived (connect refused, DNS, timeout, TLS).
    Transport,
    /// A response arrived with a non-success status.
    Protocol,
    /// A success response whose body could not be decoded.
    Decode,
}

/// Top-level error type for the `damwatch-api` crate.
///
/// Covers every failure mode of the backend HTTP surface.
/// `damwatch-core` maps these into its own fetch and dispatch errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// The backend answered with a non-success HTTP status.
    #[error("API error (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Classify this error into transport / protocol / decode.
    pub fn kind(&self) -> FetchFailure {
        match self {
            Self::Transport(e) if e.is_decode() => FetchFailure::Decode,
            Self::Transport(e) if e.status().is_some() => FetchFailure::Protocol,
            Self::Transport(_) | Self::InvalidUrl(_) | Self::Tls(_) => FetchFailure::Transport,
            Self::Status { .. } => FetchFailure::Protocol,
            Self::Deserialization { .. } => FetchFailure::Decode,
        }
    }

    /// HTTP status code, if the backend responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
