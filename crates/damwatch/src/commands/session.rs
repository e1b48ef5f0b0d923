//! Session command handlers: login, logout, whoami.

use damwatch_core::{CredentialPolicy, Session};

use crate::cli::LoginArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

fn detail(s: &Session) -> String {
    format!("Name:     {}\nRole:     {}", s.name, s.role)
}

pub fn login(ctx: &Context, args: LoginArgs) -> Result<(), CliError> {
    let username = args.username.unwrap_or_else(|| {
        let CredentialPolicy::Static { identity, .. } = &ctx.dashboard.config().credentials;
        identity.clone()
    });

    let password = match args.password {
        Some(p) => p,
        None => rpassword::prompt_password(format!("Password for {username}: "))?,
    };

    let session = ctx.dashboard.login(&username, &password)?;
    let out = output::render_single(
        ctx.format,
        &session,
        |s| format!("Logged in as {} ({})", s.name, s.role),
        |s| s.name.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<(), CliError> {
    let previous = ctx.dashboard.current_session();
    ctx.dashboard.logout()?;
    if !ctx.quiet {
        match previous {
            Some(s) => eprintln!("Logged out {}", s.name),
            None => eprintln!("No active session"),
        }
    }
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<(), CliError> {
    let session = ctx.dashboard.current_session();
    let out = output::render_single(
        ctx.format,
        &session,
        |s| s.as_ref().map_or_else(|| "Not logged in".to_owned(), detail),
        |s| s.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
