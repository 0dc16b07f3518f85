//! CLI argument parsing via clap.

use clap::Parser;
use std::path::PathBuf;

/// Interactive prompt editor for agent sessions.
#[derive(Debug, Parser)]
#[command(name = "pilot", disable_version_flag = true)]
pub struct Args {
    /// Path to config file (default: ./pilot.toml or ~/.config/pilot/pilot.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Extra directory to load plugins from. May be repeated.
    #[arg(long = "plugin-dir", value_name = "DIR")]
    pub plugin_dirs: Vec<PathBuf>,

    /// Start in bypass-permissions mode: every tool request is allowed.
    #[arg(long = "dangerously-skip-permissions")]
    pub dangerously_skip_permissions: bool,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Print version, commit, and build time.
    #[arg(short = 'V', long = "version")]
    pub version: bool,
}
