//! One-shot dashboard: poll every source once and print the derived view.

use damwatch_core::derive::{NOT_AVAILABLE, format_value};
use damwatch_core::{AlertLevel, DashboardView};

use crate::error::CliError;
use crate::output::{self, dim, paint};

use super::Context;

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    ctx.with_deadline(ctx.dashboard.refresh()).await?;
    let view = ctx.dashboard.view();
    print_view(ctx, &view)
}

pub(super) fn print_view(ctx: &Context, view: &DashboardView) -> Result<(), CliError> {
    let out = output::render_single(ctx.format, view, |v| detail(v, ctx.color), plain)?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

/// Key/value block for table output.
pub(super) fn detail(v: &DashboardView, color: bool) -> String {
    let water = format_value(v.water_level, 0, "%");
    let rain = format!("{} ({})", format_value(Some(v.rainfall_percent), 0, "%"), v.rainfall_risk);
    let vibration = if v.vibration_alert { "ALERT" } else { "OK" };
    let vibration_level = if v.vibration_alert {
        AlertLevel::Critical
    } else {
        AlertLevel::Normal
    };

    let mut lines = vec![
        format!(
            "Water level:  {} {}",
            paint(&water, v.water_severity.alert_level(), color),
            dim(&format!("[{}]", v.water_severity), color)
        ),
        format!("Distance:     {}", format_value(v.distance_cm, 1, " cm")),
        format!("Temperature:  {}", format_value(v.temperature, 1, "°C")),
        format!("Humidity:     {}", format_value(v.humidity, 0, "%")),
        format!("Rainfall:     {}", paint(&rain, v.rainfall_risk.alert_level(), color)),
        format!("Vibration:    {}", paint(vibration, vibration_level, color)),
        format!("Last alert:   {}", v.last_vibration_text()),
        String::new(),
        format!(
            "Valve:        {} ({} mode)",
            v.valve.state, v.valve.mode
        ),
        format!(
            "Reason:       {}",
            paint(v.valve.reason.as_str(), v.valve.reason.alert_level(), color)
        ),
    ];

    if let Some(ref w) = v.weather {
        lines.push(String::new());
        lines.push(format!(
            "Weather:      {} at {}",
            w.condition,
            if w.location.is_empty() { NOT_AVAILABLE } else { w.location.as_str() }
        ));
        lines.push(format!(
            "              {}  wind {}  humidity {}",
            format_value(w.temperature, 1, "°C"),
            format_value(w.wind_speed, 1, " km/h"),
            format_value(w.humidity, 0, "%")
        ));
    }

    lines.push(String::new());
    lines.push(dim(
        &format!(
            "Reading {} · generation {} · {} history points",
            v.last_reading_at.as_deref().unwrap_or(NOT_AVAILABLE),
            v.generation,
            v.chart.len()
        ),
        color,
    ));
    lines.join("\n")
}

/// `key=value` lines for scripting.
fn plain(v: &DashboardView) -> String {
    [
        format!("water_level={}", format_value(v.water_level, 0, "")),
        format!("water_severity={}", v.water_severity),
        format!("rainfall={}", format_value(Some(v.rainfall_percent), 0, "")),
        format!("rainfall_risk={}", v.rainfall_risk),
        format!("vibration={}", v.vibration_alert),
        format!("valve_state={}", v.valve.state),
        format!("valve_mode={}", v.valve.mode),
        format!("valve_reason={}", v.valve.reason),
    ]
    .join("\n")
}
