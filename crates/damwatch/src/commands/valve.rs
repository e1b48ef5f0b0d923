//! Valve command handlers.

use serde::Serialize;
use tracing::info;

use damwatch_core::{ValveCommand, ValveControl, ValveMode};

use crate::cli::{ValveAction, ValveArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

impl From<ValveAction> for ValveControl {
    fn from(action: ValveAction) -> Self {
        match action {
            ValveAction::Auto => Self::set_mode(ValveMode::Auto),
            ValveAction::Manual => Self::set_mode(ValveMode::Manual),
            ValveAction::Open => Self::manual_open(),
            ValveAction::Close => Self::manual_close(),
        }
    }
}

#[derive(Serialize)]
struct Accepted {
    mode: ValveMode,
    command: ValveCommand,
    success: bool,
}

pub async fn handle(ctx: &Context, args: ValveArgs) -> Result<(), CliError> {
    let control = ValveControl::from(args.command);
    let ack = ctx
        .with_deadline(ctx.dashboard.dispatch(control.mode, control.command))
        .await?;
    info!(mode = %control.mode, command = %control.command, "valve command accepted");

    let accepted = Accepted {
        mode: control.mode,
        command: control.command,
        success: ack.success,
    };
    let out = output::render_single(
        ctx.format,
        &accepted,
        |a| {
            format!(
                "Accepted: mode {} command {}\nThe valve state updates on the next poll (damwatch status).",
                a.mode, a.command
            )
        },
        |a| format!("{}/{}", a.mode, a.command),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
