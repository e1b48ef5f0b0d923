//! Live dashboard: run the poll loop and print each published snapshot.

use tokio::signal;
use tracing::debug;

use damwatch_core::{AlertLevel, Dashboard, DashboardView, StaleNotice};

use crate::cli::{OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::paint;

use super::Context;
use super::status;

pub async fn handle(ctx: &Context, args: WatchArgs) -> Result<(), CliError> {
    if args.interval_ms == Some(0) {
        return Err(CliError::Validation {
            field: "interval-ms".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let dashboard = match args.interval_ms {
        Some(ms) => {
            let mut config = ctx.dashboard.config().clone();
            config.poll_interval = std::time::Duration::from_millis(ms);
            Dashboard::new(config)?
        }
        None => ctx.dashboard.clone(),
    };

    let mut snapshots = dashboard.subscribe();
    let mut poll_status = dashboard.poll_status();
    let mut last_banner: Option<StaleNotice> = None;
    let mut printed = 0usize;

    dashboard.start().await?;

    let result = loop {
        tokio::select! {
            biased;

            _ = signal::ctrl_c() => {
                debug!("interrupted");
                break Ok(());
            }

            changed = snapshots.changed() => {
                let Some(snapshot) = changed else {
                    break Ok(());
                };
                let view = DashboardView::derive(&snapshot);
                if ctx.format == OutputFormat::Table && printed > 0 && !ctx.quiet {
                    println!();
                }
                if let Err(err) = status::print_view(ctx, &view) {
                    break Err(err);
                }
                printed += 1;
                if args.count.is_some_and(|n| printed >= n) {
                    break Ok(());
                }
            }

            Ok(()) = poll_status.changed() => {
                let stale = poll_status.borrow_and_update().stale.clone();
                report_stale(ctx, last_banner.as_ref(), stale.as_ref());
                last_banner = stale;
            }
        }
    };

    dashboard.shutdown().await;
    result
}

/// Print the stale banner once when it appears, and once when it clears.
fn report_stale(ctx: &Context, previous: Option<&StaleNotice>, current: Option<&StaleNotice>) {
    if ctx.quiet {
        return;
    }
    match (previous, current) {
        (None, Some(notice)) => eprintln!(
            "{}",
            paint(
                &format!("⚠ {} (since {})", notice.message, notice.since.format("%H:%M:%S")),
                AlertLevel::Warning,
                ctx.color,
            )
        ),
        (Some(_), None) => eprintln!(
            "{}",
            paint("✓ data is live again", AlertLevel::Normal, ctx.color)
        ),
        _ => {}
    }
}
