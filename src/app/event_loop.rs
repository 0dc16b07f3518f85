//! Raw-mode terminal loop driving the session engine.

use crate::app::view::{build_frame, Screen};
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEvent};
use crossterm::{execute, terminal};
use pilot::session::events::{EngineMessage, InputEvent};
use pilot::session::submit::SubmitOutcome;
use pilot::session::SessionEngine;
use pilot::tui::commands::BuiltinCommand;
use pilot::tui::keys::{map_key, KeyAction};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const EVENT_POLL_MS: u64 = 50;

/// Terminal events forwarded from the blocking reader.
#[derive(Debug)]
enum TerminalEvent {
    Key(KeyEvent),
    Paste(String),
    Resize,
}

/// Whether the loop keeps going after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Continue,
    Quit,
}

/// Restores cooked mode and bracketed paste on every exit path.
struct TerminalGuard;

impl TerminalGuard {
    fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(err) = execute!(io::stderr(), EnableBracketedPaste) {
            let _ = terminal::disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stderr(), DisableBracketedPaste);
        let _ = terminal::disable_raw_mode();
    }
}

/// Run until the user quits, then shut the engine down.
pub(crate) async fn run(
    mut engine: SessionEngine,
    mut engine_rx: mpsc::UnboundedReceiver<EngineMessage>,
    mut transcript_rx: mpsc::UnboundedReceiver<String>,
    color: bool,
) -> io::Result<()> {
    let guard = TerminalGuard::acquire()?;
    let stop = Arc::new(AtomicBool::new(false));
    let (term_tx, mut term_rx) = mpsc::unbounded_channel();
    let reader = {
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || read_terminal_events(term_tx, stop))
    };

    let mut stderr = io::stderr();
    let mut screen = Screen::new(color);
    screen.draw(&mut stderr, &build_frame(&engine))?;

    let result = loop {
        let control = tokio::select! {
            Some(event) = term_rx.recv() => match event {
                TerminalEvent::Key(key) => handle_key(&mut engine, &mut screen, map_key(key)),
                TerminalEvent::Paste(text) => {
                    engine.handle_input(InputEvent::Paste(text));
                    Control::Continue
                }
                TerminalEvent::Resize => Control::Continue,
            },
            Some(message) = engine_rx.recv() => {
                engine.handle_message(message);
                Control::Continue
            }
            Some(line) = transcript_rx.recv() => {
                screen.push_transcript(line);
                Control::Continue
            }
            else => Control::Quit,
        };
        if control == Control::Quit {
            break Ok(());
        }
        if let Err(err) = screen.draw(&mut stderr, &build_frame(&engine)) {
            break Err(err);
        }
    };

    stop.store(true, Ordering::Relaxed);
    engine.shutdown();
    while let Ok(line) = transcript_rx.try_recv() {
        screen.push_transcript(line);
    }
    screen.finish(&mut stderr)?;
    drop(guard);
    if let Err(err) = reader.await {
        tracing::warn!(error = %err, "terminal reader task failed");
    }
    result
}

/// Apply one mapped key. Ctrl-C clears the draft, then aborts work, then
/// quits; Ctrl-D quits on an empty draft.
pub(crate) fn handle_key(engine: &mut SessionEngine, screen: &mut Screen, action: KeyAction) -> Control {
    match action {
        KeyAction::Ignore => Control::Continue,
        KeyAction::Interrupt => {
            if !engine.text().is_empty() {
                engine.clear_input();
                Control::Continue
            } else if engine.is_loading() || engine.is_command_running() {
                engine.abort_active();
                Control::Continue
            } else {
                Control::Quit
            }
        }
        KeyAction::Eof if engine.text().is_empty() => Control::Quit,
        KeyAction::Eof => Control::Continue,
        KeyAction::Input(event) => match engine.handle_input(event) {
            Some(SubmitOutcome::Builtin(BuiltinCommand::Quit)) => Control::Quit,
            Some(SubmitOutcome::Builtin(BuiltinCommand::Clear)) => {
                screen.push_transcript("(cleared)".to_string());
                Control::Continue
            }
            Some(SubmitOutcome::Busy) => {
                screen.push_transcript("busy: wait for the current task or press Esc".to_string());
                Control::Continue
            }
            _ => Control::Continue,
        },
    }
}

fn read_terminal_events(tx: mpsc::UnboundedSender<TerminalEvent>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match event::poll(Duration::from_millis(EVENT_POLL_MS)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                tracing::warn!(error = %err, "terminal poll failed");
                return;
            }
        }
        let forwarded = match event::read() {
            Ok(Event::Key(key)) => TerminalEvent::Key(key),
            Ok(Event::Paste(text)) => TerminalEvent::Paste(text),
            Ok(Event::Resize(_, _)) => TerminalEvent::Resize,
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "terminal read failed");
                return;
            }
        };
        if tx.send(forwarded).is_err() {
            return;
        }
    }
}
