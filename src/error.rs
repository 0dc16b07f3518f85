//! Unified error types for the session engine.

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// Errors raised by the foreground shell-command executor.
///
/// Process failures (non-zero exit, signals, spawn errors) are recorded on the
/// command's `ShellProcess` instead; only caller-side misuse surfaces here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A second command was started while one is still running.
    AlreadyRunning { command: String },
    /// The completion handle was dropped before an exit code was recorded.
    Detached,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning { command } => {
                write!(f, "a command is already running: {command}")
            }
            Self::Detached => write!(f, "command finished without reporting an exit code"),
        }
    }
}

impl std::error::Error for CommandError {}

// ---------------------------------------------------------------------------
// PermissionError
// ---------------------------------------------------------------------------

/// Rejection of a pending tool-permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionError {
    /// The user cancelled the prompt; treat as deny.
    Cancelled,
    /// The session engine is gone and can no longer present prompts.
    Unavailable,
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "permission request was cancelled"),
            Self::Unavailable => write!(f, "permission prompt is unavailable"),
        }
    }
}

impl std::error::Error for PermissionError {}

// ---------------------------------------------------------------------------
// SearchError
// ---------------------------------------------------------------------------

/// Failure of an overlay candidate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchError(pub String);

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate search failed: {}", self.0)
    }
}

impl std::error::Error for SearchError {}

// ---------------------------------------------------------------------------
// EngineError: top-level
// ---------------------------------------------------------------------------

/// Top-level error type for the session engine.
#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_display() {
        let err = CommandError::AlreadyRunning {
            command: "sleep 5".into(),
        };
        assert_eq!(err.to_string(), "a command is already running: sleep 5");
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let s = ConfigError::from(io_err).to_string();
        assert!(s.starts_with("io:"), "got: {s}");
        assert!(s.contains("file not found"));
    }

    #[test]
    fn config_error_from_toml() {
        let toml_err: toml::de::Error = toml::from_str::<toml::Value>("x = [unclosed").unwrap_err();
        assert!(ConfigError::from(toml_err).to_string().starts_with("toml:"));
    }

    #[test]
    fn engine_error_wraps_config_and_io() {
        let err = EngineError::from(ConfigError::Invalid("bad mode".into()));
        assert!(err.to_string().starts_with("config:"), "got: {err}");
        let io_err = std::io::Error::new(std::io::ErrorKind::Unsupported, "no tty");
        assert_eq!(EngineError::from(io_err).to_string(), "io: no tty");
    }

    #[test]
    fn search_error_display() {
        assert_eq!(
            SearchError("walk aborted".into()).to_string(),
            "candidate search failed: walk aborted"
        );
    }
}
