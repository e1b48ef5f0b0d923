// Backend wire types
//
// Payloads come from a sensor gateway that forwards whatever the field
// nodes report, so field presence and even field types drift between
// firmware revisions. Numeric fields decode leniently (anything that is
// not a JSON number becomes `None`) so one odd value never fails a poll.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Lenient field decoders ───────────────────────────────────────────

/// Decode a JSON number as `f64`; every other shape is treated as absent.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

/// Decode a truthiness flag: `true`, non-zero numbers, `"true"` and `"1"`.
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(is_truthy))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => matches!(s.trim(), "true" | "TRUE" | "True" | "1"),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Decode through `T`'s own representation, defaulting on any mismatch.
fn lenient_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

// ── Readings ─────────────────────────────────────────────────────────

/// One sensor reading from `GET /api/readings`.
///
/// The rainfall-probability value arrives under one of several alias
/// names; those (and anything else the node sent) stay in `fields` so
/// the derivation layer can apply its alias priority to the raw values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: String,
    #[serde(
        default,
        rename = "temp",
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub humidity: Option<f64>,
    /// Distance from the ultrasonic sensor to the water surface, in cm.
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub distance: Option<f64>,
    /// Water level as a percentage of reservoir capacity.
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub percent: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub vibration: Option<bool>,
    /// Catch-all for aliased and undocumented fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Reading {
    /// Raw value of an open field, treating JSON `null` as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Water level percent, falling back to the older `water_percent` name.
    pub fn water_level_percent(&self) -> Option<f64> {
        self.percent
            .or_else(|| self.field("water_percent").and_then(Value::as_f64))
    }

    /// The timestamp parsed as RFC 3339, if it is in that format.
    ///
    /// Some gateways send a pre-formatted display string instead, in
    /// which case this returns `None` and callers keep the raw text.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// ── Valve ────────────────────────────────────────────────────────────

/// Physical valve position as reported by the field controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ValveState {
    Open,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Who is driving the valve: the controller's own rules, or an operator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ValveMode {
    #[default]
    Auto,
    Manual,
}

/// Manual command sent alongside a mode change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ValveCommand {
    Open,
    Close,
    #[default]
    None,
}

/// Unrecognised or absent modes fall back to AUTO, the controller default.
fn lenient_mode<'de, D>(deserializer: D) -> Result<ValveMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

/// Actuator status from `GET /api/valve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValveStatus {
    #[serde(default, deserialize_with = "lenient_default")]
    pub state: ValveState,
    /// Why the controller last moved the valve (`HIGH_WATER`, `VIBRATION`,
    /// `SAFE_LEVEL`, or something newer). Empty when not reported.
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: ValveMode,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
}

/// Request body for `POST /api/valve/control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveControl {
    pub mode: ValveMode,
    pub command: ValveCommand,
}

impl ValveControl {
    /// Switch mode without moving the valve.
    pub fn set_mode(mode: ValveMode) -> Self {
        Self {
            mode,
            command: ValveCommand::None,
        }
    }

    pub fn manual_open() -> Self {
        Self {
            mode: ValveMode::Manual,
            command: ValveCommand::Open,
        }
    }

    pub fn manual_close() -> Self {
        Self {
            mode: ValveMode::Manual,
            command: ValveCommand::Close,
        }
    }
}

/// Acknowledgement from `POST /api/valve/control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAck {
    #[serde(default)]
    pub success: bool,
}

// ── Weather ──────────────────────────────────────────────────────────

/// Ambient conditions from `GET /api/weather`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    #[serde(default, deserialize_with = "lenient_string")]
    pub location_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
    #[serde(default, rename = "windspeed", deserialize_with = "lenient_f64")]
    pub wind_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: Option<f64>,
    /// WMO weather interpretation code.
    #[serde(default, rename = "weathercode", deserialize_with = "lenient_f64")]
    pub weather_code: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: String,
}

// ── Logs ─────────────────────────────────────────────────────────────

/// One entry from `GET /api/vibration/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibrationLog {
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub node_id: Option<String>,
}

/// One entry from `GET /api/waterlevel/logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterLevelLog {
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_cm: Option<f64>,
    /// Older nodes report the distance under `distance`.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default)]
    pub node_id: Option<String>,
}

impl WaterLevelLog {
    /// Distance in cm, whichever field the node used.
    pub fn distance_cm(&self) -> Option<f64> {
        self.distance_cm.or(self.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn reading_keeps_aliases_in_open_fields() {
        let reading: Reading = serde_json::from_value(json!({
            "timestamp": "2024-06-15T10:30:00Z",
            "temp": 28.5,
            "humidity": "n/a",
            "water_percent": 55,
            "rain_prediction": "30",
            "vibration": 0
        }))
        .unwrap();

        assert_eq!(reading.temperature, Some(28.5));
        assert_eq!(reading.humidity, None);
        assert_eq!(reading.percent, None);
        assert_eq!(reading.water_level_percent(), Some(55.0));
        assert_eq!(reading.vibration, Some(false));
        assert_eq!(reading.field("rain_prediction"), Some(&json!("30")));
        assert!(reading.parsed_timestamp().is_some());
    }

    #[test]
    fn null_fields_are_absent() {
        let reading: Reading = serde_json::from_value(json!({
            "timestamp": "t1",
            "rainfall": null,
            "percent": null
        }))
        .unwrap();

        assert_eq!(reading.field("rainfall"), None);
        assert_eq!(reading.percent, None);
        assert_eq!(reading.parsed_timestamp(), None);
    }

    #[test]
    fn reading_without_timestamp_is_rejected() {
        let result = serde_json::from_value::<Reading>(json!({ "percent": 10 }));
        assert!(result.is_err());
    }

    #[test]
    fn vibration_truthiness() {
        for (raw, expected) in [
            (json!(true), true),
            (json!(1), true),
            (json!("1"), true),
            (json!("true"), true),
            (json!(false), false),
            (json!(0), false),
            (json!("no"), false),
        ] {
            let reading: Reading =
                serde_json::from_value(json!({ "timestamp": "t", "vibration": raw })).unwrap();
            assert_eq!(reading.vibration, Some(expected), "input {raw}");
        }
    }

    #[test]
    fn valve_status_defaults_unknown_fields() {
        let status: ValveStatus =
            serde_json::from_value(json!({ "state": "HALF", "mode": "remote" })).unwrap();
        assert_eq!(status.state, ValveState::Unknown);
        assert_eq!(status.mode, ValveMode::Auto);

        let status: ValveStatus =
            serde_json::from_value(json!({ "state": null, "mode": "manual" })).unwrap();
        assert_eq!(status.state, ValveState::Unknown);
        assert_eq!(status.mode, ValveMode::Manual);
        assert!(status.reason.is_empty());
    }

    #[test]
    fn valve_control_serializes_uppercase() {
        let body = serde_json::to_value(ValveControl::manual_open()).unwrap();
        assert_eq!(body, json!({ "mode": "MANUAL", "command": "OPEN" }));

        let body = serde_json::to_value(ValveControl::set_mode(ValveMode::Auto)).unwrap();
        assert_eq!(body, json!({ "mode": "AUTO", "command": "NONE" }));
    }

    #[test]
    fn mode_and_command_parse_case_insensitively() {
        assert_eq!("manual".parse::<ValveMode>().unwrap(), ValveMode::Manual);
        assert_eq!("Close".parse::<ValveCommand>().unwrap(), ValveCommand::Close);
        assert!("sideways".parse::<ValveCommand>().is_err());
    }

    #[test]
    fn water_level_log_prefers_distance_cm() {
        let log: WaterLevelLog = serde_json::from_value(json!({
            "timestamp": "t",
            "distanceCm": 41.2,
            "distance": 99,
            "nodeId": "node-3"
        }))
        .unwrap();
        assert_eq!(log.distance_cm(), Some(41.2));

        let legacy: WaterLevelLog =
            serde_json::from_value(json!({ "timestamp": "t", "distance": 40 })).unwrap();
        assert_eq!(legacy.distance_cm(), Some(40.0));
    }
}
