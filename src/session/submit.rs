//! Submission routing.

use crate::session::attachments::ImageAttachment;
use crate::tui::commands::{parse_builtin, parse_invocation, BuiltinCommand};

/// Where a submitted line went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to submit; the buffer is untouched.
    Empty,
    /// The agent is loading or a command is running; the buffer is kept.
    Busy,
    /// `!command` sent to the shell executor.
    Shell(String),
    /// `#note` sent to the runtime's memory.
    Memory(String),
    /// Session-level command handled by the engine or host.
    Builtin(BuiltinCommand),
    /// `/name args` known to the runtime's registry.
    SlashCommand { name: String, args: String },
    /// Ordinary message plus the attachments that go with it.
    Message {
        text: String,
        images: Vec<ImageAttachment>,
    },
}

/// Route expanded submit text.
///
/// `has_slash_command` is consulted with the bare command name. `Message`
/// routes come back with an empty image list for the caller to fill.
pub fn classify(text: &str, has_slash_command: impl Fn(&str) -> bool) -> SubmitOutcome {
    if let Some(command) = text.strip_prefix('!') {
        if !text.contains('\n') {
            let command = command.trim();
            if command.is_empty() {
                return SubmitOutcome::Empty;
            }
            return SubmitOutcome::Shell(command.to_string());
        }
    }
    if let Some(note) = text.strip_prefix('#') {
        return SubmitOutcome::Memory(note.trim().to_string());
    }
    if let Some(builtin) = parse_builtin(text) {
        return SubmitOutcome::Builtin(builtin);
    }
    if let Some(invocation) = parse_invocation(text) {
        if has_slash_command(&invocation.name) {
            return SubmitOutcome::SlashCommand {
                name: invocation.name,
                args: invocation.args,
            };
        }
    }
    SubmitOutcome::Message {
        text: text.to_string(),
        images: Vec::new(),
    }
}
