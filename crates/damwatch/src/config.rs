//! CLI configuration: thin wrapper around `damwatch_config`.
//!
//! Applies `GlobalOpts` flag overrides (--api-url, --timeout, --insecure)
//! on top of the loaded file + environment.

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use damwatch_config::{Config, config_path, load_config, save_config};

/// Load the config file, then apply flag overrides.
pub fn effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.api_url {
        cfg.api_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    if global.insecure {
        cfg.insecure = true;
    }
}

/// `--output`, else `[defaults] output`, else table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        clap::ValueEnum::from_str(&cfg.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// `--color`, else `[defaults] color`, else auto.
pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> ColorMode {
    global.color.unwrap_or_else(|| {
        clap::ValueEnum::from_str(&cfg.defaults.color, true).unwrap_or(ColorMode::Auto)
    })
}
