//! Shared test fixtures for editor, executor, and engine test modules.

use crate::error::SearchError;
use crate::runtime::AgentRuntime;
use crate::session::attachments::ImageAttachment;
use crate::session::observer::SessionObserver;
use crate::session::permissions::{ConfirmationRequest, PermissionMode};
use crate::session::process::ShellProcess;
use crate::session::submit::SubmitOutcome;
use crate::tui::commands::SlashCommand;
use crate::tui::overlay::{Candidate, OverlayState};
use crate::tui::search::CandidateSource;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("pilot-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    /// Root directory path for this fixture.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Per-callback notification counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverCounts {
    pub text_changed: usize,
    pub cursor_changed: usize,
    pub overlay_changed: usize,
    pub shell_updated: usize,
    pub permission_prompt_changed: usize,
    pub permission_mode_changed: usize,
    pub loading_changed: usize,
    pub modal_changed: usize,
    pub submitted: usize,
}

#[derive(Debug, Default)]
struct Recorded {
    counts: ObserverCounts,
    modes: Vec<PermissionMode>,
    outcomes: Vec<SubmitOutcome>,
    prompts: Vec<Option<String>>,
}

/// Observer that counts every notification and keeps the interesting ones.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    inner: Mutex<Recorded>,
}

impl RecordingObserver {
    pub fn counts(&self) -> ObserverCounts {
        self.inner.lock().expect("observer lock").counts
    }

    pub fn modes(&self) -> Vec<PermissionMode> {
        self.inner.lock().expect("observer lock").modes.clone()
    }

    pub fn outcomes(&self) -> Vec<SubmitOutcome> {
        self.inner.lock().expect("observer lock").outcomes.clone()
    }

    /// Tool names of each presented prompt; `None` when the prompt closed.
    pub fn prompts(&self) -> Vec<Option<String>> {
        self.inner.lock().expect("observer lock").prompts.clone()
    }

    fn with(&self, f: impl FnOnce(&mut Recorded)) {
        f(&mut self.inner.lock().expect("observer lock"));
    }
}

impl SessionObserver for RecordingObserver {
    fn text_changed(&self, _text: &str) {
        self.with(|r| r.counts.text_changed += 1);
    }

    fn cursor_changed(&self, _cursor: usize) {
        self.with(|r| r.counts.cursor_changed += 1);
    }

    fn overlay_changed(&self, _overlay: &OverlayState) {
        self.with(|r| r.counts.overlay_changed += 1);
    }

    fn shell_updated(&self, _process: &ShellProcess) {
        self.with(|r| r.counts.shell_updated += 1);
    }

    fn permission_prompt_changed(&self, request: Option<&ConfirmationRequest>) {
        let name = request.map(|r| r.tool_name.clone());
        self.with(|r| {
            r.counts.permission_prompt_changed += 1;
            r.prompts.push(name);
        });
    }

    fn permission_mode_changed(&self, mode: PermissionMode) {
        self.with(|r| {
            r.counts.permission_mode_changed += 1;
            r.modes.push(mode);
        });
    }

    fn loading_changed(&self, _loading: bool) {
        self.with(|r| r.counts.loading_changed += 1);
    }

    fn modal_changed(&self, _open: bool) {
        self.with(|r| r.counts.modal_changed += 1);
    }

    fn submitted(&self, outcome: &SubmitOutcome) {
        let outcome = outcome.clone();
        self.with(|r| {
            r.counts.submitted += 1;
            r.outcomes.push(outcome);
        });
    }
}

/// One call the engine made on the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Send { text: String, images: Vec<u64> },
    Abort,
    Slash { name: String, args: String },
    Memory(String),
    ModeChanged(PermissionMode),
}

/// Runtime double that records calls and knows a fixed command set.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    commands: Vec<SlashCommand>,
    calls: Mutex<Vec<RuntimeCall>>,
}

impl FakeRuntime {
    pub fn with_commands(names: &[&str]) -> Self {
        Self {
            commands: names
                .iter()
                .map(|name| SlashCommand::new(*name, format!("{name} command")))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().expect("runtime lock").clone()
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().expect("runtime lock").push(call);
    }
}

impl AgentRuntime for FakeRuntime {
    fn send_message(&self, text: String, images: Vec<ImageAttachment>) {
        self.record(RuntimeCall::Send {
            text,
            images: images.iter().map(|image| image.id).collect(),
        });
    }

    fn abort(&self) {
        self.record(RuntimeCall::Abort);
    }

    fn has_slash_command(&self, name: &str) -> bool {
        self.commands
            .iter()
            .any(|cmd| cmd.name.trim_start_matches('/') == name)
    }

    fn slash_commands(&self) -> Vec<SlashCommand> {
        self.commands.clone()
    }

    fn run_slash_command(&self, name: &str, args: &str) {
        self.record(RuntimeCall::Slash {
            name: name.to_string(),
            args: args.to_string(),
        });
    }

    fn add_memory(&self, text: String) {
        self.record(RuntimeCall::Memory(text));
    }

    fn permission_mode_changed(&self, mode: PermissionMode) {
        self.record(RuntimeCall::ModeChanged(mode));
    }
}

/// Candidate source returning a fixed list filtered by substring.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub values: Vec<String>,
    pub fail: bool,
}

impl StaticSource {
    pub fn new(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|v| v.to_string()).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            values: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        if self.fail {
            return Err(SearchError("static source failure".into()));
        }
        Ok(self
            .values
            .iter()
            .filter(|value| value.contains(query))
            .map(|value| Candidate::new(value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
    }

    #[test]
    fn recording_observer_counts_calls() {
        let observer = RecordingObserver::default();
        observer.text_changed("a");
        observer.permission_mode_changed(PermissionMode::AcceptEdits);
        let counts = observer.counts();
        assert_eq!(counts.text_changed, 1);
        assert_eq!(counts.cursor_changed, 0);
        assert_eq!(observer.modes(), [PermissionMode::AcceptEdits]);
    }

    #[test]
    fn fake_runtime_matches_bare_names() {
        let runtime = FakeRuntime::with_commands(&["review"]);
        assert!(runtime.has_slash_command("review"));
        assert!(!runtime.has_slash_command("/review"));
        runtime.add_memory("note".into());
        assert_eq!(runtime.calls(), [RuntimeCall::Memory("note".into())]);
    }
}
