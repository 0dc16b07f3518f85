//! Prompt-area rendering.
//!
//! A frame is plain lines plus the cursor position inside them; the screen
//! repaints the frame in place below the scrolling transcript.

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::style::{Color, Print, PrintStyledContent, Stylize};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;
use pilot::session::permissions::ConfirmationRequest;
use pilot::session::SessionEngine;
use pilot::tui::overlay::OverlayState;
use std::io::{self, Write};

const PROMPT: &str = "> ";
const CONTINUATION: &str = "  ";
const MAX_INPUT_PREVIEW: usize = 60;

const HELP_LINES: &[&str] = &[
    "Enter submit · Alt+Enter newline · Ctrl+R history search",
    "@path file completion · /command completion · Tab insert · Esc dismiss",
    "!cmd run shell · #note add memory · Shift+Tab permission mode",
    "Alt+Y allow · Alt+A always · Alt+N deny · Ctrl+C clear/abort · Ctrl+D quit",
    "Esc to close this help",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineStyle {
    Status,
    Prompt,
    Candidate { selected: bool },
    Attention,
    Dim,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    pub text: String,
    pub style: LineStyle,
}

impl Line {
    fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub lines: Vec<Line>,
    pub cursor_row: usize,
    pub cursor_col: usize,
}

/// Lay out everything below the transcript for the current engine state.
pub(crate) fn build_frame(engine: &SessionEngine) -> Frame {
    let mut lines = vec![Line::new(status_text(engine), LineStyle::Status)];

    if let Some(request) = engine.permission_request() {
        lines.push(Line::new(
            permission_text(request, engine.queued_permission_requests()),
            LineStyle::Attention,
        ));
    }

    let prompt_start = lines.len();
    for (idx, text) in engine.text().split('\n').enumerate() {
        let prefix = if idx == 0 { PROMPT } else { CONTINUATION };
        lines.push(Line::new(format!("{prefix}{text}"), LineStyle::Prompt));
    }
    let (row, col) = cursor_position(engine.text(), engine.cursor());

    overlay_lines(engine.overlay(), &mut lines);
    if engine.is_modal() {
        lines.extend(HELP_LINES.iter().map(|text| Line::new(*text, LineStyle::Dim)));
    }

    Frame {
        lines,
        cursor_row: prompt_start + row,
        cursor_col: col + PROMPT.chars().count(),
    }
}

fn status_text(engine: &SessionEngine) -> String {
    let mut parts = vec![format!("[{}]", engine.permission_mode())];
    if let Some(process) = engine.shell_processes().last().filter(|p| p.running) {
        parts.push(format!("running `{}` (Esc to stop)", process.command));
    } else if engine.is_loading() {
        parts.push("thinking… (Esc to abort)".to_string());
    }
    let attachments = engine.attachments().len();
    if attachments > 0 {
        parts.push(format!("{attachments} image(s) attached"));
    }
    parts.join(" ")
}

fn permission_text(request: &ConfirmationRequest, queued: usize) -> String {
    let mut input = request.tool_input.to_string();
    if input.chars().count() > MAX_INPUT_PREVIEW {
        input = input.chars().take(MAX_INPUT_PREVIEW).collect::<String>() + "…";
    }
    let mut text = format!("Allow {} {input}? Alt+Y yes", request.tool_name);
    if !request.hide_persistent_option {
        text.push_str(" · Alt+A always");
    }
    text.push_str(" · Alt+N no · Esc cancel");
    if queued > 0 {
        text.push_str(&format!(" (+{queued} queued)"));
    }
    text
}

fn overlay_lines(overlay: &OverlayState, lines: &mut Vec<Line>) {
    if let OverlayState::HistorySearch { query, .. } = overlay {
        lines.push(Line::new(format!("history search: {query}"), LineStyle::Dim));
    }
    let selected = overlay.selected_index();
    for (idx, candidate) in overlay.results().iter().enumerate() {
        let is_selected = selected == Some(idx);
        let marker = if is_selected { "▸" } else { " " };
        let text = match &candidate.description {
            Some(description) => format!("  {marker} {}  {description}", candidate.value),
            None => format!("  {marker} {}", candidate.value),
        };
        lines.push(Line::new(
            text,
            LineStyle::Candidate {
                selected: is_selected,
            },
        ));
    }
}

/// Row and column of a char-indexed cursor inside multi-line text.
pub(crate) fn cursor_position(text: &str, cursor: usize) -> (usize, usize) {
    let mut row = 0;
    let mut col = 0;
    for ch in text.chars().take(cursor) {
        if ch == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (row, col)
}

fn clip(text: &str, cols: usize) -> String {
    if cols == 0 || text.chars().count() <= cols {
        return text.to_string();
    }
    text.chars().take(cols).collect()
}

/// In-place painter for frames, with transcript lines scrolled above.
#[derive(Debug, Default)]
pub(crate) struct Screen {
    color: bool,
    previous_cursor_row: usize,
    pending: Vec<String>,
}

impl Screen {
    pub(crate) fn new(color: bool) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Queue a transcript line for the next paint.
    pub(crate) fn push_transcript(&mut self, line: String) {
        self.pending.push(line);
    }

    pub(crate) fn draw(&mut self, out: &mut impl Write, frame: &Frame) -> io::Result<()> {
        self.erase(out)?;
        for line in self.pending.drain(..) {
            for part in line.split('\n') {
                out.queue(Print(part))?;
                out.queue(Print("\r\n"))?;
            }
        }

        let cols = terminal::size().map(|(cols, _)| cols as usize).unwrap_or(0);
        for (idx, line) in frame.lines.iter().enumerate() {
            if idx > 0 {
                out.queue(Print("\r\n"))?;
            }
            let text = match line.style {
                LineStyle::Prompt => line.text.clone(),
                _ => clip(&line.text, cols),
            };
            self.print_line(out, &text, line.style)?;
        }

        let bottom_row = frame.lines.len().saturating_sub(1);
        let up = bottom_row.saturating_sub(frame.cursor_row);
        if up > 0 {
            out.queue(MoveUp(up as u16))?;
        }
        out.queue(MoveToColumn(frame.cursor_col as u16))?;
        out.flush()?;
        self.previous_cursor_row = frame.cursor_row;
        Ok(())
    }

    /// Clear the frame and leave the cursor on a fresh line.
    pub(crate) fn finish(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.erase(out)?;
        for line in self.pending.drain(..) {
            out.queue(Print(line))?;
            out.queue(Print("\r\n"))?;
        }
        out.flush()
    }

    fn erase(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.previous_cursor_row > 0 {
            out.queue(MoveUp(self.previous_cursor_row as u16))?;
        }
        out.queue(MoveToColumn(0))?;
        out.queue(Clear(ClearType::FromCursorDown))?;
        self.previous_cursor_row = 0;
        Ok(())
    }

    fn print_line(&self, out: &mut impl Write, text: &str, style: LineStyle) -> io::Result<()> {
        if !self.color {
            out.queue(Print(text))?;
            return Ok(());
        }
        let styled = match style {
            LineStyle::Status => text.with(Color::DarkGrey),
            LineStyle::Prompt => text.with(Color::Reset),
            LineStyle::Candidate { selected: true } => text.with(Color::Green).bold(),
            LineStyle::Candidate { selected: false } => text.with(Color::Grey),
            LineStyle::Attention => text.with(Color::Yellow).bold(),
            LineStyle::Dim => text.with(Color::DarkGrey),
        };
        out.queue(PrintStyledContent(styled))?;
        Ok(())
    }
}
