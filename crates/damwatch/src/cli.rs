//! Clap derive structures for the `damwatch` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use damwatch_core::LogKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// damwatch -- dam telemetry and valve control from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "damwatch",
    version,
    about = "Monitor dam telemetry and control the spillway valve",
    long_about = "Polls a dam monitoring backend for water level, rainfall, vibration,\n\
        weather and valve state, and sends operator valve commands.\n\n\
        Valve control and historical logs require an admin session (damwatch login).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend base URL (overrides config)
    #[arg(long, short = 'u', env = "DAMWATCH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "DAMWATCH_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "DAMWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "DAMWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an operator session
    Login(LoginArgs),

    /// End the operator session
    Logout,

    /// Show the current operator session
    Whoami,

    /// Poll every source once and print the dashboard
    #[command(alias = "st")]
    Status,

    /// Poll continuously and print each new snapshot
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Change valve mode or move the valve (admin)
    #[command(alias = "v")]
    Valve(ValveArgs),

    /// Show historical logs (admin)
    Logs(LogsArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Operator identity [default: from config]
    #[arg(long)]
    pub username: Option<String>,

    /// Operator secret (prompted for when omitted)
    #[arg(long, env = "DAMWATCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in milliseconds (overrides config)
    #[arg(long, short = 'i')]
    pub interval_ms: Option<u64>,

    /// Exit after this many snapshots
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Valve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ValveArgs {
    #[command(subcommand)]
    pub command: ValveAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ValveAction {
    /// Hand control back to the field controller
    Auto,
    /// Take manual control without moving the valve
    Manual,
    /// Switch to manual and open the valve
    Open,
    /// Switch to manual and close the valve
    Close,
}

// ── Logs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Which log to show
    pub kind: LogView,

    /// Show at most this many rows
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogView {
    /// Ultrasonic distance samples
    WaterLevel,
    /// Vibration alert events
    Vibration,
    /// Temperature and humidity readings
    Env,
    /// Rainfall probability readings
    Rainfall,
    /// Every reading field
    All,
}

impl From<LogView> for LogKind {
    fn from(view: LogView) -> Self {
        match view {
            LogView::WaterLevel => Self::WaterLevel,
            LogView::Vibration => Self::Vibration,
            LogView::Env => Self::Env,
            LogView::Rainfall => Self::Rainfall,
            LogView::All => Self::All,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
