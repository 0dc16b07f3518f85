//! Terminal key mapping onto engine input events.

use crate::session::events::InputEvent;
use crate::session::permissions::PermissionDecision;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What the host loop should do with one terminal key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Input(InputEvent),
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-D.
    Eof,
    Ignore,
}

/// Map one crossterm key event.
pub fn map_key(key: KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let event = match key.code {
        KeyCode::Char('c') if ctrl => return KeyAction::Interrupt,
        KeyCode::Char('d') if ctrl => return KeyAction::Eof,
        KeyCode::Char('r') if ctrl => InputEvent::HistorySearch,
        KeyCode::Char('a') if ctrl => InputEvent::LineStart,
        KeyCode::Char('e') if ctrl => InputEvent::LineEnd,
        KeyCode::Char('b') if ctrl => InputEvent::Left,
        KeyCode::Char('f') if ctrl => InputEvent::Right,
        KeyCode::Char('k') if ctrl => InputEvent::KillToLineEnd,
        KeyCode::Char('u') if ctrl => InputEvent::KillToLineStart,
        KeyCode::Char('w') if ctrl => InputEvent::DeleteWordBackward,
        KeyCode::Char('p') if ctrl => InputEvent::Up,
        KeyCode::Char('n') if ctrl => InputEvent::Down,
        KeyCode::Char(ch) if alt => match ch.to_ascii_lowercase() {
            'y' => InputEvent::PermissionKey(PermissionDecision::Allow),
            'a' => InputEvent::PermissionKey(PermissionDecision::AllowAlways),
            'n' => InputEvent::PermissionKey(PermissionDecision::Deny),
            _ => return KeyAction::Ignore,
        },
        KeyCode::Char(_) if ctrl => return KeyAction::Ignore,
        KeyCode::Char(ch) => InputEvent::Char(ch),
        KeyCode::Enter if alt => InputEvent::Newline,
        KeyCode::Enter => InputEvent::Enter,
        KeyCode::Backspace if alt => InputEvent::DeleteWordBackward,
        KeyCode::Backspace => InputEvent::Backspace,
        KeyCode::Delete => InputEvent::Delete,
        KeyCode::Left => InputEvent::Left,
        KeyCode::Right => InputEvent::Right,
        KeyCode::Up => InputEvent::Up,
        KeyCode::Down => InputEvent::Down,
        KeyCode::Home => InputEvent::Home,
        KeyCode::End => InputEvent::End,
        KeyCode::BackTab => InputEvent::CyclePermissionMode,
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
            InputEvent::CyclePermissionMode
        }
        KeyCode::Tab => InputEvent::Tab,
        KeyCode::Esc => InputEvent::Escape,
        _ => return KeyAction::Ignore,
    };
    KeyAction::Input(event)
}
