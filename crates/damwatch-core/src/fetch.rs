// ── Source fetchers ──
//
// One bounded request per backend endpoint. The four poll sources run
// concurrently; each owns only its own result slot, and a slow source
// is cut off by its timeout rather than holding up the tick forever.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use damwatch_api::DamClient;

use crate::error::FetchError;
use crate::snapshot::PollResults;

/// A backend endpoint the dashboard reads from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Source {
    Readings,
    Valve,
    Weather,
    VibrationLog,
    WaterLevelLog,
}

/// Run one endpoint call under `timeout`, tagging any failure with `endpoint`.
///
/// Dropping the returned future abandons the request; nothing is
/// written anywhere until it resolves.
pub async fn fetch_source<T, F>(endpoint: Source, timeout: Duration, call: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, damwatch_api::Error>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            debug!(source = %endpoint, error = %e, "fetch failed");
            Err(FetchError::from_api(endpoint, &e))
        }
        Err(_) => {
            debug!(source = %endpoint, timeout_ms = timeout.as_millis(), "fetch timed out");
            Err(FetchError::timed_out(endpoint, timeout))
        }
    }
}

/// Fetch every poll source concurrently and wait for all of them to settle.
pub async fn fetch_all(client: &DamClient, timeout: Duration) -> PollResults {
    let (readings, actuator, weather, vibration_log) = tokio::join!(
        fetch_source(Source::Readings, timeout, client.readings()),
        fetch_source(Source::Valve, timeout, client.valve_status()),
        fetch_source(Source::Weather, timeout, client.weather()),
        fetch_source(Source::VibrationLog, timeout, client.vibration_logs()),
    );

    PollResults {
        readings,
        actuator,
        weather,
        vibration_log,
    }
}
