//! Default configuration constants.
//!
//! Callers share these constants so literal values live in one place.

/// Pastes longer than this many characters are replaced by a placeholder.
pub(super) const DEFAULT_COMPRESSION_THRESHOLD: usize = 200;
/// Quiet period before an overlay candidate lookup actually runs.
pub(super) const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 80;
/// Maximum number of candidates kept for one overlay query.
pub(super) const DEFAULT_MAX_CANDIDATES: usize = 8;
/// Maximum number of input history entries retained.
pub(super) const DEFAULT_HISTORY_LIMIT: usize = 1000;
/// Shell used for `!`-prefixed commands.
pub(super) const DEFAULT_SHELL_PROGRAM: &str = "sh";

/// Tools auto-approved while the session is in accept-edits mode.
pub(super) fn default_edit_tools() -> Vec<String> {
    ["Edit", "MultiEdit", "Write", "NotebookEdit"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}
