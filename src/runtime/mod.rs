//! Agent runtime boundary.
//!
//! The session engine never runs the agent itself. It forwards submissions to
//! an [`AgentRuntime`] and answers the runtime's tool-permission questions
//! through a [`PermissionBroker`].

use crate::session::attachments::ImageAttachment;
use crate::session::permissions::PermissionMode;
use crate::tui::commands::SlashCommand;

mod broker;

pub use broker::PermissionBroker;

/// Entry points the engine calls on the agent runtime.
///
/// Calls are fire-and-forget: implementations start their own work and report
/// progress back through engine messages (`LoadingChanged`, permission
/// prompts, mode pushes).
pub trait AgentRuntime: Send + Sync {
    fn send_message(&self, text: String, images: Vec<ImageAttachment>);

    /// Abort the in-flight agent call, if any.
    fn abort(&self);

    /// Whether `name` (without the leading slash) is a registered command.
    fn has_slash_command(&self, name: &str) -> bool;

    /// Registered commands for completion.
    fn slash_commands(&self) -> Vec<SlashCommand> {
        Vec::new()
    }

    fn run_slash_command(&self, name: &str, args: &str);

    /// `#`-prefixed input: a note for the agent's memory.
    fn add_memory(&self, text: String);

    /// The engine changed the permission mode (Shift+Tab).
    fn permission_mode_changed(&self, _mode: PermissionMode) {}
}
