// ── Derived operational state ──
//
// Pure functions from a snapshot to display-ready values: clamped
// percentages, risk buckets, safety reasons, weather labels. Every
// function is total; missing data comes back as `None` / "NA" /
// `Unknown`, never as a panic or an error.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use damwatch_api::{Reading, ValveMode, ValveState, VibrationLog, Weather};

use crate::snapshot::OperationalSnapshot;

/// Field names the rainfall probability may arrive under, highest
/// priority first.
pub const RAINFALL_ALIASES: [&str; 5] = [
    "rainPredPercent",
    "rain_prediction",
    "rainfall",
    "rainPercent",
    "rain",
];

/// Rendered in place of any value that is missing or not a number.
pub const NOT_AVAILABLE: &str = "NA";

// ── Percentages ──────────────────────────────────────────────────────

/// Clamp to `[0, 100]`. Absent and NaN stay `None`, so a real 0 is
/// never confused with "no data".
pub fn clamp_percent(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan()).map(|v| v.clamp(0.0, 100.0))
}

/// Render with fixed decimals and a unit suffix, or `NA`.
pub fn format_value(value: Option<f64>, decimals: usize, unit: &str) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.decimals$}{unit}"),
        _ => NOT_AVAILABLE.to_owned(),
    }
}

// ── Rainfall ─────────────────────────────────────────────────────────

/// The first non-null rainfall alias on `reading`, unparsed.
pub fn raw_rainfall(reading: &Reading) -> Option<&Value> {
    RAINFALL_ALIASES
        .iter()
        .find_map(|alias| reading.field(alias))
}

/// Resolve the rainfall probability of one reading.
///
/// Only the first present alias is considered. Strings contribute their
/// leading decimal number (`"45%"` is 45). Anything else, and a reading
/// with no alias at all, resolve to 0.
pub fn resolve_rainfall(reading: &Reading) -> f64 {
    let parsed = match raw_rainfall(reading) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => leading_number(s),
        _ => None,
    };
    parsed.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// Longest prefix of `s` (after leading whitespace) that reads as a
/// decimal literal: sign, digits, fraction, exponent, or `Infinity`.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        let sign = if bytes.first() == Some(&b'-') { -1.0 } else { 1.0 };
        return Some(sign * f64::INFINITY);
    }

    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Rainfall percent as shown on the gauge: resolved, then clamped.
/// No reading at all shows as 0.
pub fn rainfall_percent(latest: Option<&Reading>) -> f64 {
    clamp_percent(latest.map(resolve_rainfall)).unwrap_or(0.0)
}

/// Rainfall risk bucket. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display)]
pub enum RainfallRisk {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    #[strum(serialize = "Very High")]
    VeryHigh,
}

impl RainfallRisk {
    pub fn classify(percent: f64) -> Self {
        if percent >= 70.0 {
            Self::VeryHigh
        } else if percent >= 40.0 {
            Self::High
        } else if percent >= 20.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn alert_level(self) -> AlertLevel {
        match self {
            Self::VeryHigh => AlertLevel::Critical,
            Self::High => AlertLevel::Warning,
            Self::Moderate | Self::Low => AlertLevel::Normal,
        }
    }
}

// ── Water level ──────────────────────────────────────────────────────

/// Water level bucket. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WaterSeverity {
    Normal,
    Elevated,
    Critical,
    Unknown,
}

impl WaterSeverity {
    pub fn classify(percent: Option<f64>) -> Self {
        match clamp_percent(percent) {
            None => Self::Unknown,
            Some(p) if p >= 80.0 => Self::Critical,
            Some(p) if p >= 60.0 => Self::Elevated,
            Some(_) => Self::Normal,
        }
    }

    pub fn alert_level(self) -> AlertLevel {
        match self {
            Self::Critical => AlertLevel::Critical,
            Self::Elevated => AlertLevel::Warning,
            Self::Normal | Self::Unknown => AlertLevel::Normal,
        }
    }
}

// ── Valve safety reason ──────────────────────────────────────────────

/// Coarse severity used to colour derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
}

/// Why the field controller last moved the valve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyReason {
    HighWater,
    Vibration,
    SafeLevel,
    /// A reason this build does not know about, kept verbatim.
    Other(String),
}

impl SafetyReason {
    /// Classify a raw reason; empty means `SAFE_LEVEL`.
    pub fn classify(raw: &str) -> Self {
        match raw.trim() {
            "" | "SAFE_LEVEL" => Self::SafeLevel,
            "HIGH_WATER" => Self::HighWater,
            "VIBRATION" => Self::Vibration,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::HighWater => "HIGH_WATER",
            Self::Vibration => "VIBRATION",
            Self::SafeLevel => "SAFE_LEVEL",
            Self::Other(raw) => raw,
        }
    }

    pub fn alert_level(&self) -> AlertLevel {
        match self {
            Self::HighWater => AlertLevel::Critical,
            Self::Vibration => AlertLevel::Warning,
            Self::SafeLevel | Self::Other(_) => AlertLevel::Normal,
        }
    }
}

impl fmt::Display for SafetyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SafetyReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Weather ──────────────────────────────────────────────────────────

/// Human label for a WMO weather interpretation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum WeatherCondition {
    #[strum(serialize = "Clear sky")]
    #[serde(rename = "Clear sky")]
    ClearSky,
    #[strum(serialize = "Partly cloudy")]
    #[serde(rename = "Partly cloudy")]
    PartlyCloudy,
    Cloudy,
    Foggy,
    Drizzle,
    Rain,
    Snow,
    Storm,
    /// A code outside the known groups.
    #[strum(serialize = "Weather")]
    #[serde(rename = "Weather")]
    Other,
    Unknown,
}

impl WeatherCondition {
    pub fn from_code(code: Option<f64>) -> Self {
        let Some(code) = code else {
            return Self::Unknown;
        };
        if code.is_nan() || code.fract() != 0.0 {
            return Self::Other;
        }
        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
        let code = code as i64;
        match code {
            0 => Self::ClearSky,
            1 | 2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Foggy,
            51 | 53 | 55 | 56 | 57 => Self::Drizzle,
            61 | 63 | 65 | 66 | 67 => Self::Rain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Storm,
            _ => Self::Other,
        }
    }
}

// ── Vibration ────────────────────────────────────────────────────────

/// Live vibration alert: the latest reading's flag, nothing else.
pub fn vibration_alert(latest: Option<&Reading>) -> bool {
    latest.and_then(|r| r.vibration).unwrap_or(false)
}

// ── Dashboard view ───────────────────────────────────────────────────

/// One point of the temperature / humidity chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSummary {
    pub location: String,
    pub condition: WeatherCondition,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub observed_at: String,
}

impl From<&Weather> for WeatherSummary {
    fn from(w: &Weather) -> Self {
        Self {
            location: w.location_name.clone(),
            condition: WeatherCondition::from_code(w.weather_code),
            temperature: w.temperature,
            wind_speed: w.wind_speed,
            humidity: w.humidity,
            observed_at: w.time.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValveSummary {
    pub state: ValveState,
    pub reason: SafetyReason,
    pub mode: ValveMode,
    pub updated_at: String,
}

/// Everything a front end shows, derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub generation: u64,
    pub last_reading_at: Option<String>,
    pub water_level: Option<f64>,
    pub water_severity: WaterSeverity,
    pub distance_cm: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall_percent: f64,
    pub rainfall_risk: RainfallRisk,
    pub vibration_alert: bool,
    pub last_vibration: Option<VibrationLog>,
    pub valve: ValveSummary,
    pub weather: Option<WeatherSummary>,
    pub chart: Vec<ChartPoint>,
}

impl DashboardView {
    pub fn derive(snapshot: &OperationalSnapshot) -> Self {
        let latest = snapshot.latest.as_ref();
        let water_level = clamp_percent(latest.and_then(Reading::water_level_percent));
        let rainfall = rainfall_percent(latest);

        let valve = snapshot.actuator.as_ref().map_or_else(
            || ValveSummary {
                state: ValveState::Unknown,
                reason: SafetyReason::SafeLevel,
                mode: ValveMode::Auto,
                updated_at: String::new(),
            },
            |a| ValveSummary {
                state: a.state,
                reason: SafetyReason::classify(&a.reason),
                mode: a.mode,
                updated_at: a.timestamp.clone(),
            },
        );

        let chart = snapshot
            .history
            .iter()
            .map(|r| ChartPoint {
                timestamp: r.timestamp.clone(),
                temperature: r.temperature,
                humidity: r.humidity,
            })
            .collect();

        Self {
            generation: snapshot.generation,
            last_reading_at: latest.map(|r| r.timestamp.clone()),
            water_level,
            water_severity: WaterSeverity::classify(water_level),
            distance_cm: latest.and_then(|r| r.distance).filter(|d| !d.is_nan()),
            temperature: latest.and_then(|r| r.temperature),
            humidity: latest.and_then(|r| r.humidity),
            rainfall_percent: rainfall,
            rainfall_risk: RainfallRisk::classify(rainfall),
            vibration_alert: vibration_alert(latest),
            last_vibration: snapshot.last_vibration.clone(),
            valve,
            weather: snapshot.weather.as_ref().map(WeatherSummary::from),
            chart,
        }
    }

    /// Text for the "last vibration alert" line.
    pub fn last_vibration_text(&self) -> String {
        match &self.last_vibration {
            Some(event) if !event.timestamp.is_empty() => event.timestamp.clone(),
            _ => "No recent vibration alerts".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reading(value: serde_json::Value) -> Reading {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn clamp_percent_bounds_and_sentinel() {
        assert_eq!(clamp_percent(Some(-5.0)), Some(0.0));
        assert_eq!(clamp_percent(Some(140.0)), Some(100.0));
        assert_eq!(clamp_percent(Some(0.0)), Some(0.0));
        assert_eq!(clamp_percent(Some(f64::NAN)), None);
        assert_eq!(clamp_percent(None), None);
    }

    #[test]
    fn clamp_percent_is_idempotent() {
        for v in [-10.0, 0.0, 33.3, 100.0, 250.0, f64::INFINITY, f64::NEG_INFINITY] {
            let once = clamp_percent(Some(v));
            assert_eq!(clamp_percent(once), once, "input {v}");
            let p = once.unwrap();
            assert!((0.0..=100.0).contains(&p));
        }
    }

    #[test]
    fn rainfall_alias_priority_first_wins() {
        let r = reading(json!({ "timestamp": "t", "rain_prediction": 30, "rainfall": 70 }));
        assert_eq!(resolve_rainfall(&r), 30.0);

        let r = reading(json!({ "timestamp": "t", "rain": 5, "rainPredPercent": 12 }));
        assert_eq!(resolve_rainfall(&r), 12.0);
    }

    #[test]
    fn rainfall_null_alias_is_skipped() {
        let r = reading(json!({ "timestamp": "t", "rainPredPercent": null, "rainPercent": "44.5" }));
        assert_eq!(resolve_rainfall(&r), 44.5);
    }

    #[test]
    fn rainfall_unparsable_or_absent_is_zero() {
        let r = reading(json!({ "timestamp": "t", "rain_prediction": "soon", "rainfall": 70 }));
        assert_eq!(resolve_rainfall(&r), 0.0);

        let r = reading(json!({ "timestamp": "t" }));
        assert_eq!(resolve_rainfall(&r), 0.0);
        assert_eq!(rainfall_percent(None), 0.0);
    }

    #[test]
    fn rainfall_boolean_is_zero() {
        let r = reading(json!({ "timestamp": "t", "rain_prediction": true, "rainfall": 70 }));
        assert_eq!(resolve_rainfall(&r), 0.0);
    }

    #[test]
    fn rainfall_string_uses_leading_number() {
        let r = reading(json!({ "timestamp": "t", "rainfall": "45%" }));
        assert_eq!(resolve_rainfall(&r), 45.0);

        let r = reading(json!({ "timestamp": "t", "rainfall": " 12.5 mm" }));
        assert_eq!(resolve_rainfall(&r), 12.5);

        let r = reading(json!({ "timestamp": "t", "rainfall": ".5e1x" }));
        assert_eq!(resolve_rainfall(&r), 5.0);

        let r = reading(json!({ "timestamp": "t", "rainfall": "-." }));
        assert_eq!(resolve_rainfall(&r), 0.0);
    }

    #[test]
    fn leading_number_stops_at_incomplete_exponent() {
        assert_eq!(leading_number("3e"), Some(3.0));
        assert_eq!(leading_number("7.e+x"), Some(7.0));
        assert_eq!(leading_number("-Infinity and beyond"), Some(f64::NEG_INFINITY));
        assert_eq!(leading_number("abc"), None);
    }

    #[test]
    fn rainfall_percent_is_clamped() {
        let r = reading(json!({ "timestamp": "t", "rainfall": 180 }));
        assert_eq!(rainfall_percent(Some(&r)), 100.0);
    }

    #[test]
    fn rainfall_risk_thresholds() {
        assert_eq!(RainfallRisk::classify(70.0), RainfallRisk::VeryHigh);
        assert_eq!(RainfallRisk::classify(69.9), RainfallRisk::High);
        assert_eq!(RainfallRisk::classify(40.0), RainfallRisk::High);
        assert_eq!(RainfallRisk::classify(20.0), RainfallRisk::Moderate);
        assert_eq!(RainfallRisk::classify(19.99), RainfallRisk::Low);
        assert_eq!(RainfallRisk::VeryHigh.to_string(), "Very High");
    }

    #[test]
    fn water_severity_thresholds() {
        assert_eq!(WaterSeverity::classify(Some(80.0)), WaterSeverity::Critical);
        assert_eq!(WaterSeverity::classify(Some(79.9)), WaterSeverity::Elevated);
        assert_eq!(WaterSeverity::classify(Some(60.0)), WaterSeverity::Elevated);
        assert_eq!(WaterSeverity::classify(Some(12.0)), WaterSeverity::Normal);
        assert_eq!(WaterSeverity::classify(None), WaterSeverity::Unknown);
    }

    #[test]
    fn safety_reason_classification() {
        assert_eq!(SafetyReason::classify(""), SafetyReason::SafeLevel);
        assert_eq!(SafetyReason::classify("HIGH_WATER"), SafetyReason::HighWater);
        assert_eq!(SafetyReason::classify("VIBRATION"), SafetyReason::Vibration);
        let other = SafetyReason::classify("MAINTENANCE");
        assert_eq!(other, SafetyReason::Other("MAINTENANCE".into()));
        assert_eq!(other.to_string(), "MAINTENANCE");
        assert_eq!(SafetyReason::HighWater.alert_level(), AlertLevel::Critical);
    }

    #[test]
    fn weather_code_labels() {
        let label = |code: Option<f64>| WeatherCondition::from_code(code).to_string();
        assert_eq!(label(Some(0.0)), "Clear sky");
        assert_eq!(label(Some(2.0)), "Partly cloudy");
        assert_eq!(label(Some(3.0)), "Cloudy");
        assert_eq!(label(Some(48.0)), "Foggy");
        assert_eq!(label(Some(57.0)), "Drizzle");
        assert_eq!(label(Some(66.0)), "Rain");
        assert_eq!(label(Some(86.0)), "Snow");
        assert_eq!(label(Some(99.0)), "Storm");
        assert_eq!(label(Some(4.0)), "Weather");
        assert_eq!(label(Some(61.5)), "Weather");
        assert_eq!(label(None), "Unknown");
    }

    #[test]
    fn format_value_renders_na() {
        assert_eq!(format_value(Some(41.237), 1, " cm"), "41.2 cm");
        assert_eq!(format_value(Some(55.0), 0, "%"), "55%");
        assert_eq!(format_value(None, 1, "°C"), "NA");
        assert_eq!(format_value(Some(f64::NAN), 1, ""), "NA");
    }

    #[test]
    fn view_of_empty_snapshot_is_all_unknown() {
        let view = DashboardView::derive(&OperationalSnapshot::default());
        assert_eq!(view.generation, 0);
        assert_eq!(view.water_level, None);
        assert_eq!(view.water_severity, WaterSeverity::Unknown);
        assert_eq!(view.rainfall_percent, 0.0);
        assert_eq!(view.rainfall_risk, RainfallRisk::Low);
        assert!(!view.vibration_alert);
        assert_eq!(view.valve.state, ValveState::Unknown);
        assert_eq!(view.valve.reason, SafetyReason::SafeLevel);
        assert_eq!(view.last_vibration_text(), "No recent vibration alerts");
    }

    #[test]
    fn view_derives_from_latest_and_history() {
        let snapshot = OperationalSnapshot {
            generation: 3,
            latest: Some(reading(json!({
                "timestamp": "t2", "percent": 85, "distance": 12.34,
                "temp": 29.1, "humidity": 61, "vibration": 1, "rainfall": "45"
            }))),
            history: vec![
                reading(json!({ "timestamp": "t1", "temp": 28.0 })),
                reading(json!({ "timestamp": "t2", "temp": 29.1 })),
            ],
            actuator: Some(
                serde_json::from_value(json!({ "state": "OPEN", "reason": "HIGH_WATER" })).unwrap(),
            ),
            weather: Some(serde_json::from_value(json!({ "weathercode": 95 })).unwrap()),
            last_vibration: Some(
                serde_json::from_value(json!({ "timestamp": "v9", "level": "HIGH" })).unwrap(),
            ),
        };

        let view = DashboardView::derive(&snapshot);

        assert_eq!(view.water_level, Some(85.0));
        assert_eq!(view.water_severity, WaterSeverity::Critical);
        assert_eq!(view.rainfall_percent, 45.0);
        assert_eq!(view.rainfall_risk, RainfallRisk::High);
        assert!(view.vibration_alert);
        assert_eq!(view.valve.state, ValveState::Open);
        assert_eq!(view.valve.mode, ValveMode::Auto);
        assert_eq!(view.valve.reason, SafetyReason::HighWater);
        assert_eq!(view.weather.as_ref().unwrap().condition, WeatherCondition::Storm);
        assert_eq!(view.chart.len(), 2);
        assert_eq!(view.chart[0].temperature, Some(28.0));
        assert_eq!(view.last_vibration_text(), "v9");
    }

    #[test]
    fn vibration_alert_ignores_event_log() {
        let snapshot = OperationalSnapshot {
            latest: Some(reading(json!({ "timestamp": "t", "vibration": false }))),
            last_vibration: Some(
                serde_json::from_value(json!({ "timestamp": "v1", "level": "HIGH" })).unwrap(),
            ),
            ..OperationalSnapshot::default()
        };
        assert!(!DashboardView::derive(&snapshot).vibration_alert);
    }
}
