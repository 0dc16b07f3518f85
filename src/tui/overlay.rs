//! Mutually exclusive input overlays: file completion, slash-command
//! completion, and history search.
//!
//! The selector is synchronous. Buffer edits produce [`LookupRequest`]s that
//! the caller schedules (debounced) and later feeds back through
//! [`OverlaySelector::apply_results`]. Every request carries a generation;
//! results for anything but the latest generation are dropped.

use crate::error::SearchError;

/// Which overlay a lookup belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    File,
    Command,
    History,
}

/// One selectable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    pub description: Option<String>,
}

impl Candidate {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: Some(description.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    None,
    FileSelect {
        trigger_pos: usize,
        query: String,
        results: Vec<Candidate>,
        selected_index: usize,
    },
    CommandSelect {
        trigger_pos: usize,
        query: String,
        results: Vec<Candidate>,
        selected_index: usize,
    },
    HistorySearch {
        query: String,
        results: Vec<Candidate>,
        selected_index: usize,
    },
}

impl OverlayState {
    pub fn kind(&self) -> Option<OverlayKind> {
        match self {
            Self::None => None,
            Self::FileSelect { .. } => Some(OverlayKind::File),
            Self::CommandSelect { .. } => Some(OverlayKind::Command),
            Self::HistorySearch { .. } => Some(OverlayKind::History),
        }
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::FileSelect { query, .. }
            | Self::CommandSelect { query, .. }
            | Self::HistorySearch { query, .. } => Some(query),
        }
    }

    pub fn results(&self) -> &[Candidate] {
        match self {
            Self::None => &[],
            Self::FileSelect { results, .. }
            | Self::CommandSelect { results, .. }
            | Self::HistorySearch { results, .. } => results,
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::FileSelect { selected_index, .. }
            | Self::CommandSelect { selected_index, .. }
            | Self::HistorySearch { selected_index, .. } => Some(*selected_index),
        }
    }

    fn trigger_pos(&self) -> Option<usize> {
        match self {
            Self::FileSelect { trigger_pos, .. } | Self::CommandSelect { trigger_pos, .. } => {
                Some(*trigger_pos)
            }
            _ => None,
        }
    }
}

/// A lookup the caller should run after the debounce window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub generation: u64,
    pub kind: OverlayKind,
    pub query: String,
}

/// Buffer contents after committing a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub text: String,
    pub cursor: usize,
}

#[derive(Debug, Default)]
pub struct OverlaySelector {
    state: OverlayState,
    generation: u64,
}

impl OverlaySelector {
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, OverlayState::None)
    }

    pub fn kind(&self) -> Option<OverlayKind> {
        self.state.kind()
    }

    /// Generation of the most recent lookup request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// React to `inserted` having been typed so the buffer now reads `text`
    /// with the cursor at `cursor`.
    pub fn after_insert(&mut self, inserted: &str, text: &str, cursor: usize) -> Option<LookupRequest> {
        match self.state.kind() {
            None => {
                let trigger_pos = cursor.checked_sub(1)?;
                match inserted {
                    "@" => {
                        self.activate(OverlayState::FileSelect {
                            trigger_pos,
                            query: String::new(),
                            results: Vec::new(),
                            selected_index: 0,
                        });
                        Some(self.next_request(OverlayKind::File, String::new()))
                    }
                    "/" if trigger_pos == 0 => {
                        self.activate(OverlayState::CommandSelect {
                            trigger_pos,
                            query: String::new(),
                            results: Vec::new(),
                            selected_index: 0,
                        });
                        Some(self.next_request(OverlayKind::Command, String::new()))
                    }
                    _ => None,
                }
            }
            Some(OverlayKind::File | OverlayKind::Command) => {
                if inserted.chars().any(char::is_whitespace) {
                    self.deactivate("token completed");
                    return None;
                }
                self.refresh_query(text, cursor)
            }
            // History search keeps its own query; the buffer is untouched.
            Some(OverlayKind::History) => None,
        }
    }

    /// React to a deletion or cursor movement.
    ///
    /// Reaching or passing the trigger character closes the overlay.
    pub fn after_edit(&mut self, text: &str, cursor: usize) -> Option<LookupRequest> {
        let trigger_pos = self.state.trigger_pos()?;
        if cursor <= trigger_pos {
            self.deactivate("cursor reached trigger");
            return None;
        }
        self.refresh_query(text, cursor)
    }

    /// Open history search, replacing any other overlay.
    pub fn open_history_search(&mut self) -> LookupRequest {
        self.activate(OverlayState::HistorySearch {
            query: String::new(),
            results: Vec::new(),
            selected_index: 0,
        });
        self.next_request(OverlayKind::History, String::new())
    }

    /// Append typed text to the history-search query.
    pub fn history_query_push(&mut self, s: &str) -> Option<LookupRequest> {
        let OverlayState::HistorySearch { query, .. } = &mut self.state else {
            return None;
        };
        query.push_str(s);
        let query = query.clone();
        Some(self.next_request(OverlayKind::History, query))
    }

    /// Remove the last char of the history-search query.
    pub fn history_query_pop(&mut self) -> Option<LookupRequest> {
        let OverlayState::HistorySearch { query, .. } = &mut self.state else {
            return None;
        };
        query.pop();
        let query = query.clone();
        Some(self.next_request(OverlayKind::History, query))
    }

    /// Install lookup results. Stale generations and results for a closed
    /// overlay are discarded; failures become an empty list.
    ///
    /// Returns whether the state changed.
    pub fn apply_results(
        &mut self,
        generation: u64,
        result: Result<Vec<Candidate>, SearchError>,
    ) -> bool {
        if generation != self.generation || !self.is_active() {
            tracing::debug!(generation, latest = self.generation, "discarding superseded lookup");
            return false;
        }
        let candidates = result.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "overlay lookup failed");
            Vec::new()
        });
        match &mut self.state {
            OverlayState::None => return false,
            OverlayState::FileSelect {
                results,
                selected_index,
                ..
            }
            | OverlayState::CommandSelect {
                results,
                selected_index,
                ..
            }
            | OverlayState::HistorySearch {
                results,
                selected_index,
                ..
            } => {
                *results = candidates;
                *selected_index = 0;
            }
        }
        true
    }

    /// Move the highlighted candidate by `delta`, wrapping at both ends.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.state.results().len();
        if len == 0 {
            return;
        }
        if let OverlayState::FileSelect { selected_index, .. }
        | OverlayState::CommandSelect { selected_index, .. }
        | OverlayState::HistorySearch { selected_index, .. } = &mut self.state
        {
            let len = len as isize;
            *selected_index = (*selected_index as isize + delta).rem_euclid(len) as usize;
        }
    }

    pub fn selected(&self) -> Option<&Candidate> {
        let idx = self.state.selected_index()?;
        self.state.results().get(idx)
    }

    /// Close the overlay; the trigger character stays as plain text.
    pub fn dismiss(&mut self) {
        if self.is_active() {
            self.deactivate("dismissed");
        }
    }

    /// Replace the `@query` span with `value` plus a trailing space.
    pub fn select_file(&mut self, value: &str, text: &str, cursor: usize) -> Option<Selection> {
        let OverlayState::FileSelect { trigger_pos, .. } = self.state else {
            return None;
        };
        let chars: Vec<char> = text.chars().collect();
        let end = cursor.clamp(trigger_pos, chars.len());
        let mut out: String = chars[..trigger_pos.min(chars.len())].iter().collect();
        out.push_str(value);
        out.push(' ');
        let new_cursor = out.chars().count();
        out.extend(&chars[end..]);
        self.deactivate("file selected");
        Some(Selection {
            text: out,
            cursor: new_cursor,
        })
    }

    /// Commit a command for immediate execution. The caller clears the
    /// input and runs `/name`.
    pub fn select_command_execute(&mut self, name: &str) -> Option<String> {
        if self.kind() != Some(OverlayKind::Command) {
            return None;
        }
        self.deactivate("command executed");
        Some(slash_name(name))
    }

    /// Commit a command for further editing: the buffer becomes `/name `.
    pub fn select_command_insert(&mut self, name: &str) -> Option<Selection> {
        if self.kind() != Some(OverlayKind::Command) {
            return None;
        }
        self.deactivate("command inserted");
        let text = format!("{} ", slash_name(name));
        let cursor = text.chars().count();
        Some(Selection { text, cursor })
    }

    /// Accept a history-search entry as the new buffer contents.
    pub fn accept_history(&mut self, value: &str) -> Option<Selection> {
        if self.kind() != Some(OverlayKind::History) {
            return None;
        }
        self.deactivate("history entry accepted");
        Some(Selection {
            text: value.to_string(),
            cursor: value.chars().count(),
        })
    }

    fn refresh_query(&mut self, text: &str, cursor: usize) -> Option<LookupRequest> {
        let kind = self.state.kind()?;
        let trigger_pos = self.state.trigger_pos()?;
        let new_query: String = text
            .chars()
            .skip(trigger_pos + 1)
            .take(cursor.saturating_sub(trigger_pos + 1))
            .collect();
        match &mut self.state {
            OverlayState::FileSelect { query, .. } | OverlayState::CommandSelect { query, .. } => {
                if *query == new_query {
                    return None;
                }
                *query = new_query.clone();
            }
            _ => return None,
        }
        Some(self.next_request(kind, new_query))
    }

    fn activate(&mut self, state: OverlayState) {
        tracing::debug!(kind = ?state.kind(), "overlay activated");
        self.state = state;
    }

    fn deactivate(&mut self, reason: &str) {
        tracing::debug!(kind = ?self.state.kind(), reason, "overlay deactivated");
        self.state = OverlayState::None;
        // Invalidate anything still in flight.
        self.generation += 1;
    }

    fn next_request(&mut self, kind: OverlayKind, query: String) -> LookupRequest {
        self.generation += 1;
        LookupRequest {
            generation: self.generation,
            kind,
            query,
        }
    }
}

fn slash_name(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}
