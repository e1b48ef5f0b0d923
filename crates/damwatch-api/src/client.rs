// Backend HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, status checking and
// body decoding. Every endpoint method is independent: the only shared
// piece is reqwest's connection pool, so concurrent calls never observe
// each other and dropping a future abandons just that request.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{ControlAck, Reading, ValveControl, ValveStatus, VibrationLog, WaterLevelLog, Weather};
use crate::transport::TransportConfig;

/// Longest body excerpt carried in error messages.
const BODY_PREVIEW_LEN: usize = 200;

/// HTTP client for the dam backend.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DamClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the backend root (e.g. `http://localhost:5000`);
    /// endpoint paths are appended to it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/readings`, newest first.
    pub async fn readings(&self) -> Result<Vec<Reading>, Error> {
        self.get("api/readings").await
    }

    /// `GET /api/valve`
    pub async fn valve_status(&self) -> Result<ValveStatus, Error> {
        self.get("api/valve").await
    }

    /// `GET /api/weather`
    pub async fn weather(&self) -> Result<Weather, Error> {
        self.get("api/weather").await
    }

    /// `GET /api/vibration/logs`, newest first.
    pub async fn vibration_logs(&self) -> Result<Vec<VibrationLog>, Error> {
        self.get("api/vibration/logs").await
    }

    /// `GET /api/waterlevel/logs`, newest first.
    pub async fn water_level_logs(&self) -> Result<Vec<WaterLevelLog>, Error> {
        self.get("api/waterlevel/logs").await
    }

    /// `POST /api/valve/control`
    ///
    /// Returns the backend's acknowledgement as-is; a `success: false`
    /// answer is not an error at this layer.
    pub async fn control_valve(&self, control: &ValveControl) -> Result<ControlAck, Error> {
        debug!(mode = %control.mode, command = %control.command, "sending valve control");
        self.post("api/valve/control", control).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join an endpoint path onto the base URL, tolerating a base with or
    /// without a trailing slash or a path prefix.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{}", path.trim_start_matches('/'));
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.endpoint_url(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        parse_response(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.endpoint_url(path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_response(resp).await
    }
}

/// Check the status, then decode the body as `T`.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body: preview(&body).to_owned(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    trace!(len = body.len(), "response body received");

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
