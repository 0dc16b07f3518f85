//! Diagnostic logging setup.
//!
//! The terminal belongs to the line editor, so log records go to a file under
//! the config root instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "PILOT_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber writing to `path`.
///
/// Returns the log path when logging was enabled. When the file cannot be
/// opened (or a subscriber is already installed) logging stays off.
pub fn init(path: Option<PathBuf>) -> Option<PathBuf> {
    let path = path?;
    let file = open_log_file(&path)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(std::env::var(LOG_ENV_VAR).ok().as_deref()))
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok();
    installed.then_some(path)
}

/// Filter from an explicit directive, falling back to `info` on empty or
/// unparsable input.
pub fn env_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn open_log_file(path: &Path) -> Option<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
