//! Slash-command metadata and parsing.

/// Slash command metadata used by both submission and autocomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub name: String,
    pub description: String,
}

impl SlashCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.starts_with('/') {
            name
        } else {
            format!("/{name}")
        };
        Self {
            name,
            description: description.into(),
        }
    }
}

/// Commands handled by the session itself rather than the agent runtime.
const BUILTIN_COMMANDS: [(&str, &str); 5] = [
    ("/help", "List available slash commands."),
    ("/clear", "Clear pasted text, attachments, and the screen."),
    ("/quit", "Exit interactive mode."),
    ("/exit", "Exit interactive mode."),
    ("/q", "Short alias for exit."),
];

pub fn builtin_commands() -> Vec<SlashCommand> {
    BUILTIN_COMMANDS
        .iter()
        .map(|(name, description)| SlashCommand::new(*name, *description))
        .collect()
}

/// Parsed built-in command actions consumed by the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    Help,
    Clear,
    Quit,
}

/// A `/name args` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashInvocation {
    /// Name without the leading slash.
    pub name: String,
    pub args: String,
}

/// Split `/name args` into its parts.
///
/// Returns `None` if the input is not a slash command.
pub fn parse_invocation(input: &str) -> Option<SlashInvocation> {
    let trimmed = input.trim();
    let rest = trimmed.strip_prefix('/')?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some(SlashInvocation {
        name: name.to_string(),
        args: args.to_string(),
    })
}

/// Parse a built-in command from user input.
pub fn parse_builtin(input: &str) -> Option<BuiltinCommand> {
    let invocation = parse_invocation(input)?;
    match invocation.name.to_ascii_lowercase().as_str() {
        "help" => Some(BuiltinCommand::Help),
        "clear" => Some(BuiltinCommand::Clear),
        "quit" | "exit" | "q" => Some(BuiltinCommand::Quit),
        _ => None,
    }
}
