//! Configuration data model.
//!
//! Struct/enum definitions plus default values. Loader and source-resolution
//! logic stays in `config::mod` so precedence behavior is centralized.

use serde::Deserialize;

use super::defaults::{
    default_edit_tools, DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_HISTORY_LIMIT,
    DEFAULT_MAX_CANDIDATES, DEFAULT_SEARCH_DEBOUNCE_MS, DEFAULT_SHELL_PROGRAM,
};
use crate::session::attachments::AttachmentPolicy;
use crate::session::permissions::PermissionMode;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub shell: ShellConfig,
    pub permissions: PermissionsConfig,
    pub attachments: AttachmentsConfig,
    pub display: DisplayConfig,
}

/// Line-editor and overlay behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Paste length (in characters) above which text is compressed.
    pub compression_threshold: usize,
    /// Debounce window for file/command/history candidate lookups.
    pub search_debounce_ms: u64,
    pub max_candidates: usize,
    pub history_limit: usize,
    /// Persist input history under `~/.config/pilot/history`.
    pub persist_history: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            history_limit: DEFAULT_HISTORY_LIMIT,
            persist_history: true,
        }
    }
}

/// Foreground shell-command settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Program invoked as `<program> -c <command>`.
    pub program: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SHELL_PROGRAM.to_string(),
        }
    }
}

/// Tool-permission settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Mode the session starts in.
    pub mode: PermissionMode,
    /// Tool names auto-approved in accept-edits mode.
    pub edit_tools: Vec<String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            mode: PermissionMode::Default,
            edit_tools: default_edit_tools(),
        }
    }
}

/// Image attachment submission policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    pub policy: AttachmentPolicy,
}

/// Display / rendering preferences.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { color: true }
    }
}
