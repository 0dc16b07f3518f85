//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`PILOT_SHELL`, `PILOT_PERMISSION_MODE`,
//!    `PILOT_SEARCH_DEBOUNCE_MS`).
//! 2. TOML file specified via --config CLI flag
//! 3. ./pilot.toml in the current directory
//! 4. $XDG_CONFIG_HOME/pilot/pilot.toml (or ~/.config/pilot/pilot.toml)
//! 5. Built-in defaults

use crate::error::ConfigError;
use crate::session::permissions::PermissionMode;
use std::path::{Path, PathBuf};

mod defaults;
mod types;

pub use types::{
    AttachmentsConfig, Config, DisplayConfig, EditorConfig, PermissionsConfig, ShellConfig,
};

/// Where the effective configuration text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Local,
    Global(PathBuf),
    BuiltInDefaults,
}

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    let (config, source) = load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )?;
    tracing::debug!(?source, "configuration loaded");
    Ok(config)
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<(Config, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) = read_config_text(path_override, &read_file, &config_root)?;
    let mut config: Config = toml::from_str(&config_text)?;
    apply_env_overrides(&mut config, &env_lookup)?;
    validate(&config)?;
    Ok((config, source))
}

fn read_config_text<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<(String, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    if let Some(p) = path_override {
        let path = PathBuf::from(p);
        let text = read_file(&path)?;
        return Ok((text, ConfigSource::Explicit(path)));
    }

    if let Ok(text) = read_file(Path::new("pilot.toml")) {
        return Ok((text, ConfigSource::Local));
    }
    if let Some(dir) = config_root() {
        let global = dir.join("pilot").join("pilot.toml");
        if let Ok(text) = read_file(&global) {
            return Ok((text, ConfigSource::Global(global)));
        }
    }

    Ok((String::new(), ConfigSource::BuiltInDefaults))
}

fn apply_env_overrides<FEnv>(config: &mut Config, env_lookup: &FEnv) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(shell) = env_value(env_lookup, "PILOT_SHELL") {
        config.shell.program = shell;
    }
    if let Some(mode) = env_value(env_lookup, "PILOT_PERMISSION_MODE") {
        config.permissions.mode = mode.parse::<PermissionMode>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid PILOT_PERMISSION_MODE value `{mode}`: expected default, accept-edits, or bypass-permissions"
            ))
        })?;
    }
    if let Some(debounce) = env_value(env_lookup, "PILOT_SEARCH_DEBOUNCE_MS") {
        config.editor.search_debounce_ms = debounce.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid PILOT_SEARCH_DEBOUNCE_MS value `{debounce}`: expected integer milliseconds"
            ))
        })?;
    }
    Ok(())
}

fn env_value<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.shell.program.trim().is_empty() {
        return Err(ConfigError::Invalid("shell.program must not be empty".into()));
    }
    if config.editor.max_candidates == 0 {
        return Err(ConfigError::Invalid(
            "editor.max_candidates must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Return the default input history path (`~/.config/pilot/history`).
pub fn default_history_path() -> Option<PathBuf> {
    config_root_dir().map(|dir| dir.join("pilot").join("history"))
}

/// Return the default log file path (`~/.config/pilot/pilot.log`).
pub fn default_log_path() -> Option<PathBuf> {
    config_root_dir().map(|dir| dir.join("pilot").join("pilot.log"))
}

pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
