//! Historical log views (admin only).

use tabled::Tabled;

use damwatch_core::derive::{NOT_AVAILABLE, format_value, raw_rainfall, resolve_rainfall};
use damwatch_core::{LogEntries, LogKind, Reading, VibrationLog, WaterLevelLog};

use crate::cli::{LogsArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct WaterLevelRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Node")]
    node: String,
}

#[derive(Tabled)]
struct VibrationRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Node")]
    node: String,
}

#[derive(Tabled)]
struct EnvRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Temperature")]
    temperature: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
}

#[derive(Tabled)]
struct RainfallRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Rainfall")]
    rainfall: String,
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Rain")]
    rainfall: String,
    #[tabled(rename = "Vibration")]
    vibration: String,
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_owned()
}

/// Logged rainfall, `NA` when the reading carries no rainfall field.
fn rainfall(r: &Reading, unit: &str) -> String {
    let value = raw_rainfall(r).map(|_| resolve_rainfall(r));
    format_value(value, 0, unit)
}

impl From<&WaterLevelLog> for WaterLevelRow {
    fn from(l: &WaterLevelLog) -> Self {
        Self {
            timestamp: l.timestamp.clone(),
            distance: format_value(l.distance_cm(), 1, " cm"),
            node: or_na(l.node_id.as_deref()),
        }
    }
}

impl From<&VibrationLog> for VibrationRow {
    fn from(l: &VibrationLog) -> Self {
        Self {
            timestamp: l.timestamp.clone(),
            level: or_na(l.level.as_deref()),
            node: or_na(l.node_id.as_deref()),
        }
    }
}

impl From<&Reading> for EnvRow {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp.clone(),
            temperature: format_value(r.temperature, 1, "°C"),
            humidity: format_value(r.humidity, 0, "%"),
        }
    }
}

impl From<&Reading> for RainfallRow {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp.clone(),
            rainfall: rainfall(r, "%"),
        }
    }
}

impl From<&Reading> for ReadingRow {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp.clone(),
            level: format_value(r.water_level_percent(), 0, "%"),
            distance: format_value(r.distance, 1, " cm"),
            temperature: format_value(r.temperature, 1, "°C"),
            humidity: format_value(r.humidity, 0, "%"),
            rainfall: rainfall(r, "%"),
            vibration: r
                .vibration
                .map_or_else(|| NOT_AVAILABLE.to_owned(), |v| if v { "yes" } else { "no" }.to_owned()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: LogsArgs) -> Result<(), CliError> {
    let kind = LogKind::from(args.kind);
    let mut entries = ctx.with_deadline(ctx.dashboard.logs(kind)).await?;
    if let Some(limit) = args.limit {
        truncate(&mut entries, limit);
    }

    if ctx.format == OutputFormat::Table && !ctx.quiet {
        eprintln!("{} ({} entries)", kind.title(), entries.len());
    }

    let out = render(ctx.format, kind, &entries)?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

fn truncate(entries: &mut LogEntries, limit: usize) {
    match entries {
        LogEntries::WaterLevel(rows) => rows.truncate(limit),
        LogEntries::Vibration(rows) => rows.truncate(limit),
        LogEntries::Readings(rows) => rows.truncate(limit),
    }
}

fn render(format: OutputFormat, kind: LogKind, entries: &LogEntries) -> Result<String, CliError> {
    match entries {
        LogEntries::WaterLevel(rows) => output::render_list(
            format,
            rows,
            |l| WaterLevelRow::from(l),
            |l| format!("{}\t{}", l.timestamp, format_value(l.distance_cm(), 1, "")),
        ),
        LogEntries::Vibration(rows) => output::render_list(
            format,
            rows,
            |l| VibrationRow::from(l),
            |l| format!("{}\t{}", l.timestamp, or_na(l.level.as_deref())),
        ),
        LogEntries::Readings(rows) => match kind {
            LogKind::Env => output::render_list(format, rows, |r| EnvRow::from(r), |r| {
                format!(
                    "{}\t{}\t{}",
                    r.timestamp,
                    format_value(r.temperature, 1, ""),
                    format_value(r.humidity, 0, "")
                )
            }),
            LogKind::Rainfall => output::render_list(format, rows, |r| RainfallRow::from(r), |r| {
                format!("{}\t{}", r.timestamp, rainfall(r, ""))
            }),
            _ => output::render_list(format, rows, |r| ReadingRow::from(r), |r| r.timestamp.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> Vec<Reading> {
        serde_json::from_value(serde_json::json!([
            { "timestamp": "r3", "temp": 24.5, "humidity": 70, "rainfall": "45" },
            { "timestamp": "r2", "temp": 24.1, "humidity": 72, "rain": 0 },
            { "timestamp": "r1", "percent": 50 }
        ]))
        .unwrap()
    }

    #[test]
    fn rainfall_plain_resolves_aliases() {
        let entries = LogEntries::Readings(readings());
        let out = render(OutputFormat::Plain, LogKind::Rainfall, &entries).unwrap();
        assert_eq!(out, "r3\t45\nr2\t0\nr1\tNA");
    }

    #[test]
    fn rainfall_table_marks_missing_readings() {
        let entries = LogEntries::Readings(readings());
        let out = render(OutputFormat::Table, LogKind::Rainfall, &entries).unwrap();
        assert!(out.contains("45%"));
        assert!(out.contains("0%"));
        assert!(out.contains("NA"));
    }

    #[test]
    fn env_table_shows_na_for_missing_values() {
        let entries = LogEntries::Readings(readings());
        let out = render(OutputFormat::Table, LogKind::Env, &entries).unwrap();
        assert!(out.contains("Temperature"));
        assert!(out.contains("24.5°C"));
        assert!(out.contains("NA"));
    }

    #[test]
    fn limit_keeps_newest_rows() {
        let mut entries = LogEntries::Readings(readings());
        truncate(&mut entries, 2);
        let LogEntries::Readings(rows) = entries else {
            panic!("variant changed");
        };
        let stamps: Vec<&str> = rows.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["r3", "r2"]);
    }
}
