//! Compile-time build metadata exposed to the CLI.

use crate::session::permissions::PermissionMode;
use std::path::Path;

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("PILOT_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("PILOT_BUILD_TIMESTAMP");

/// Render the `pilot --version` block.
pub fn cli_version_text() -> String {
    format!("pilot {VERSION}\ncommit: {GIT_COMMIT}\nbuilt: {BUILD_TIMESTAMP}")
}

/// Banner line printed when an interactive session starts.
pub fn startup_banner(workdir: &Path, mode: PermissionMode) -> String {
    format!(
        "pilot v{VERSION} ({GIT_COMMIT}, built {BUILD_TIMESTAMP}) in {} [{mode}]",
        workdir.display()
    )
}
