//! Input and background-task events consumed by the session engine.

use crate::error::SearchError;
use crate::session::permissions::{PermissionAsk, PermissionDecision, PermissionMode};
use crate::tui::overlay::Candidate;
use tokio::sync::oneshot;

/// Terminal-independent key classes the engine dispatches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Char(char),
    Paste(String),
    Enter,
    /// Alt+Enter inserts a newline instead of submitting.
    Newline,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    LineStart,
    LineEnd,
    DeleteWordBackward,
    KillToLineEnd,
    KillToLineStart,
    Tab,
    Escape,
    /// Cycle the permission mode (Shift+Tab).
    CyclePermissionMode,
    /// Open history search (Ctrl+R).
    HistorySearch,
    /// Answer to the presented permission prompt (Alt+Y / Alt+A / Alt+N).
    PermissionKey(PermissionDecision),
}

/// Output of one shell process, tagged with its record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorEvent {
    Stdout { id: u64, chunk: String },
    Stderr { id: u64, chunk: String },
    Exited { id: u64, code: i32 },
}

/// A permission request travelling from the runtime to the engine.
#[derive(Debug)]
pub struct PermissionPrompt {
    pub ask: PermissionAsk,
    pub responder: oneshot::Sender<PermissionDecision>,
}

/// Messages produced by tasks the engine spawned, or by the runtime.
#[derive(Debug)]
pub enum EngineMessage {
    LookupFinished {
        generation: u64,
        result: Result<Vec<Candidate>, SearchError>,
    },
    Shell(ExecutorEvent),
    PermissionRequested(PermissionPrompt),
    /// Runtime-side mode change, applied as a plain assignment.
    PermissionModePushed(PermissionMode),
    /// Agent call started or finished.
    LoadingChanged(bool),
}
