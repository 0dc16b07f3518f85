//! Input history with Up/Down navigation and draft preservation.

use crate::tui::text_buffer::char_count;
use std::fs;
use std::io;
use std::path::Path;

/// Navigation direction through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Text (and cursor) to place in the buffer after a navigation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatedText {
    pub text: String,
    pub cursor: usize,
}

impl NavigatedText {
    fn at_end(text: String) -> Self {
        let cursor = char_count(&text);
        Self { text, cursor }
    }
}

/// Prior inputs plus the navigation cursor into them.
#[derive(Debug, Clone)]
pub struct HistoryNavigator {
    entries: Vec<String>,
    limit: usize,
    /// `None` means "not navigating".
    index: Option<usize>,
    saved_draft: String,
}

impl HistoryNavigator {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
            index: None,
            saved_draft: String::new(),
        }
    }

    /// Add a submitted input to history.
    pub fn push(&mut self, entry: &str) {
        if entry.trim().is_empty() {
            return;
        }
        if self.entries.last().map(String::as_str) == Some(entry) {
            return;
        }
        self.entries.push(entry.to_string());
        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(0..overflow);
        }
    }

    /// Step through history.
    ///
    /// The first Up saves `current_draft`; stepping Down past the newest entry
    /// restores it. Down while not navigating yields empty text. Returns `None`
    /// when Up is pressed with no history at all.
    pub fn navigate(&mut self, direction: Direction, current_draft: &str) -> Option<NavigatedText> {
        match direction {
            Direction::Up => {
                if self.entries.is_empty() {
                    return None;
                }
                let idx = match self.index {
                    Some(idx) => idx.saturating_sub(1),
                    None => {
                        self.saved_draft = current_draft.to_string();
                        self.entries.len() - 1
                    }
                };
                self.index = Some(idx);
                Some(NavigatedText::at_end(self.entries[idx].clone()))
            }
            Direction::Down => match self.index {
                None => Some(NavigatedText::at_end(String::new())),
                Some(idx) if idx + 1 < self.entries.len() => {
                    self.index = Some(idx + 1);
                    Some(NavigatedText::at_end(self.entries[idx + 1].clone()))
                }
                Some(_) => {
                    self.index = None;
                    Some(NavigatedText::at_end(self.saved_draft.clone()))
                }
            },
        }
    }

    /// Leave navigation mode. Called on every edit that isn't navigation.
    pub fn reset_navigation(&mut self) {
        self.index = None;
    }

    pub fn is_navigating(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn saved_draft(&self) -> &str {
        &self.saved_draft
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load persisted history entries from disk.
    ///
    /// Supports both JSON array (`["cmd1", "cmd2"]`) and plain line-based
    /// text files. Empty entries are ignored.
    pub fn load_file(&mut self, path: &Path) -> io::Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let raw = fs::read_to_string(path)?;
        self.entries.clear();
        self.index = None;

        if raw.trim().is_empty() {
            return Ok(());
        }

        if let Ok(entries) = serde_json::from_str::<Vec<String>>(&raw) {
            for entry in entries {
                self.push(&entry);
            }
            return Ok(());
        }

        for line in raw.lines() {
            self.push(line);
        }
        Ok(())
    }

    /// Persist history entries to disk as a compact JSON array.
    pub fn save_file(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_string(&self.entries).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to encode history: {err}"),
            )
        })?;
        fs::write(path, format!("{encoded}\n"))
    }
}

/// Case-insensitive substring search over history, newest first, without
/// duplicates.
pub fn search_entries(entries: &[String], query: &str, limit: usize) -> Vec<String> {
    let needle = query.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for entry in entries.iter().rev() {
        if out.len() >= limit {
            break;
        }
        if !entry.to_lowercase().contains(&needle) {
            continue;
        }
        if out.iter().any(|seen| seen == entry) {
            continue;
        }
        out.push(entry.clone());
    }
    out
}
