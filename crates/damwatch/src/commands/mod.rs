//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod config_cmd;
pub mod logs;
pub mod session;
pub mod status;
pub mod valve;
pub mod watch;

use std::future::Future;
use std::time::Duration;

use damwatch_core::Dashboard;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;

/// Everything a backend-bound handler needs.
pub struct Context {
    pub dashboard: Dashboard,
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Context {
    pub fn build(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = config::effective_config(global)?;
        let dashboard = Dashboard::new(cfg.to_dashboard_config()?)?;
        Ok(Self {
            dashboard,
            format: config::output_format(global, &cfg),
            color: crate::output::should_color(config::color_mode(global, &cfg)),
            quiet: global.quiet,
        })
    }

    /// Bound a one-shot backend call by the request timeout.
    pub async fn with_deadline<T, F>(&self, fut: F) -> Result<T, CliError>
    where
        F: Future<Output = Result<T, damwatch_core::CoreError>>,
    {
        let limit: Duration = self.dashboard.config().timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CliError::Timeout {
                seconds: limit.as_secs(),
            }),
        }
    }
}

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => session::login(ctx, args),
        Command::Logout => session::logout(ctx),
        Command::Whoami => session::whoami(ctx),
        Command::Status => status::handle(ctx).await,
        Command::Watch(args) => watch::handle(ctx, args).await,
        Command::Valve(args) => valve::handle(ctx, args).await,
        Command::Logs(args) => logs::handle(ctx, args).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
