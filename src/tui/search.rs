//! Candidate sources backing the overlays.

use crate::error::SearchError;
use crate::tui::commands::SlashCommand;
use crate::tui::history::search_entries;
use crate::tui::overlay::Candidate;
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Upper bound on files visited per lookup.
const MAX_WALK_ENTRIES: usize = 20_000;

/// Asynchronous candidate lookup for one overlay kind.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError>;
}

/// Fuzzy file-path search under a workspace root, honoring `.gitignore`.
#[derive(Debug, Clone)]
pub struct FileSearch {
    root: PathBuf,
    limit: usize,
}

impl FileSearch {
    pub fn new(root: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            root: root.into(),
            limit,
        }
    }
}

#[async_trait]
impl CandidateSource for FileSearch {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        let root = self.root.clone();
        let query = query.to_string();
        let limit = self.limit;
        tokio::task::spawn_blocking(move || walk_and_rank(&root, &query, limit))
            .await
            .map_err(|err| SearchError(format!("file search task failed: {err}")))?
    }
}

fn walk_and_rank(root: &Path, query: &str, limit: usize) -> Result<Vec<Candidate>, SearchError> {
    if !root.is_dir() {
        return Err(SearchError(format!("{} is not a directory", root.display())));
    }
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build();

    let mut scored: Vec<(f64, String)> = Vec::new();
    for entry in walker.flatten().take(MAX_WALK_ENTRIES) {
        let path = entry.path();
        if path == root {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        let mut display = rel.to_string_lossy().replace('\\', "/");
        if entry.file_type().is_some_and(|ft| ft.is_dir()) {
            display.push('/');
        }
        let m = fuzzy_match(query, &display);
        if m.matches {
            scored.push((m.score, display));
        }
    }
    scored.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(&b.1))
    });
    Ok(scored
        .into_iter()
        .take(limit)
        .map(|(_, path)| Candidate::new(path))
        .collect())
}

/// Prefix-then-fuzzy match over slash command names.
#[derive(Debug, Clone)]
pub struct CommandSearch {
    commands: Vec<SlashCommand>,
    limit: usize,
}

impl CommandSearch {
    pub fn new(commands: Vec<SlashCommand>, limit: usize) -> Self {
        Self { commands, limit }
    }
}

#[async_trait]
impl CandidateSource for CommandSearch {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        let query = query.trim_start_matches('/').to_ascii_lowercase();
        let mut prefixed = Vec::new();
        let mut fuzzy: Vec<(f64, &SlashCommand)> = Vec::new();
        for cmd in &self.commands {
            let bare = cmd.name.trim_start_matches('/');
            if bare.to_ascii_lowercase().starts_with(&query) {
                prefixed.push(cmd);
                continue;
            }
            let m = fuzzy_match(&query, bare);
            if m.matches {
                fuzzy.push((m.score, cmd));
            }
        }
        fuzzy.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(prefixed
            .into_iter()
            .chain(fuzzy.into_iter().map(|(_, cmd)| cmd))
            .take(self.limit)
            .map(|cmd| Candidate::with_description(&cmd.name, &cmd.description))
            .collect())
    }
}

/// Substring search over a snapshot of history entries.
#[derive(Debug, Clone)]
pub struct HistorySearch {
    entries: Vec<String>,
    limit: usize,
}

impl HistorySearch {
    pub fn new(entries: Vec<String>, limit: usize) -> Self {
        Self { entries, limit }
    }
}

#[async_trait]
impl CandidateSource for HistorySearch {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        Ok(search_entries(&self.entries, query, self.limit)
            .into_iter()
            .map(Candidate::new)
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub matches: bool,
    /// Lower is better.
    pub score: f64,
}

/// Subsequence match favoring word boundaries and consecutive runs.
pub fn fuzzy_match(query: &str, text: &str) -> FuzzyMatch {
    let query: Vec<char> = query.to_lowercase().chars().collect();
    if query.is_empty() {
        return FuzzyMatch {
            matches: true,
            score: 0.0,
        };
    }
    let text: Vec<char> = text.to_lowercase().chars().collect();
    if query.len() > text.len() {
        return FuzzyMatch {
            matches: false,
            score: 0.0,
        };
    }

    let mut query_index = 0usize;
    let mut score = 0.0f64;
    let mut last_match: Option<usize> = None;
    let mut consecutive = 0i32;

    for (i, ch) in text.iter().enumerate() {
        if query_index >= query.len() {
            break;
        }
        if *ch != query[query_index] {
            continue;
        }
        let at_boundary = i == 0
            || matches!(text[i - 1], '-' | '_' | '.' | '/' | ':')
            || text[i - 1].is_whitespace();
        match last_match {
            Some(last) if last + 1 == i => {
                consecutive += 1;
                score -= f64::from(consecutive) * 5.0;
            }
            Some(last) => {
                consecutive = 0;
                score += ((i - last - 1) as f64) * 2.0;
            }
            None => consecutive = 0,
        }
        if at_boundary {
            score -= 10.0;
        }
        score += (i as f64) * 0.1;
        last_match = Some(i);
        query_index += 1;
    }

    FuzzyMatch {
        matches: query_index == query.len(),
        score: if query_index == query.len() { score } else { 0.0 },
    }
}
