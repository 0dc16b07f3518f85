//! End-to-end session flows through the public engine API.

use pilot::config::Config;
use pilot::runtime::AgentRuntime;
use pilot::session::attachments::ImageAttachment;
use pilot::session::events::{EngineMessage, InputEvent};
use pilot::session::observer::NoopObserver;
use pilot::session::permissions::{PermissionAsk, PermissionDecision, PermissionMode};
use pilot::session::submit::SubmitOutcome;
use pilot::session::{EngineOptions, SessionEngine};
use pilot::tui::overlay::OverlayKind;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Default)]
struct ScriptedRuntime {
    sent: Mutex<Vec<String>>,
    aborted: Mutex<usize>,
}

impl AgentRuntime for ScriptedRuntime {
    fn send_message(&self, text: String, _images: Vec<ImageAttachment>) {
        self.sent.lock().unwrap().push(text);
    }

    fn abort(&self) {
        *self.aborted.lock().unwrap() += 1;
    }

    fn has_slash_command(&self, _name: &str) -> bool {
        false
    }

    fn run_slash_command(&self, _name: &str, _args: &str) {}

    fn add_memory(&self, _text: String) {}
}

struct Workspace(PathBuf);

impl Workspace {
    fn new(name: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("pilot-flow-{name}-{millis}"));
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.join("Cargo.toml"), "[package]\n").unwrap();
        Self(dir)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn engine_in(
    workdir: PathBuf,
) -> (
    SessionEngine,
    mpsc::UnboundedReceiver<EngineMessage>,
    Arc<ScriptedRuntime>,
) {
    let mut options = EngineOptions::from_config(&Config::default(), workdir);
    options.search_debounce = Duration::from_millis(5);
    let runtime = Arc::new(ScriptedRuntime::default());
    let (engine, rx) = SessionEngine::new(options, runtime.clone(), Arc::new(NoopObserver));
    (engine, rx, runtime)
}

fn type_text(engine: &mut SessionEngine, text: &str) {
    for ch in text.chars() {
        engine.handle_input(InputEvent::Char(ch));
    }
}

async fn pump_until(
    engine: &mut SessionEngine,
    rx: &mut mpsc::UnboundedReceiver<EngineMessage>,
    mut done: impl FnMut(&SessionEngine) -> bool,
) {
    while !done(engine) {
        let message = timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for engine message")
            .expect("engine channel closed");
        engine.handle_message(message);
    }
}

#[tokio::test]
async fn file_completion_walks_the_real_workspace() {
    let workspace = Workspace::new("files");
    let (mut engine, mut rx, runtime) = engine_in(workspace.0.clone());

    type_text(&mut engine, "explain @main");
    assert_eq!(engine.overlay().kind(), Some(OverlayKind::File));
    pump_until(&mut engine, &mut rx, |e| !e.overlay().results().is_empty()).await;

    engine.handle_input(InputEvent::Tab);
    assert_eq!(engine.text(), "explain src/main.rs ");

    engine.handle_input(InputEvent::Enter);
    assert_eq!(
        runtime.sent.lock().unwrap().as_slice(),
        ["explain src/main.rs "]
    );
}

#[tokio::test]
async fn shell_command_runs_in_the_session_workdir() {
    let workspace = Workspace::new("shell");
    let (mut engine, mut rx, _runtime) = engine_in(workspace.0.clone());

    type_text(&mut engine, "!ls src");
    assert_eq!(
        engine.handle_input(InputEvent::Enter),
        Some(SubmitOutcome::Shell("ls src".into()))
    );
    pump_until(&mut engine, &mut rx, |e| !e.is_command_running()).await;

    let process = &engine.shell_processes()[0];
    assert_eq!(process.exit_code, Some(0));
    assert_eq!(process.stdout.trim(), "main.rs");
}

#[tokio::test]
async fn queued_permission_requests_resolve_in_order() {
    let workspace = Workspace::new("perms");
    let (mut engine, mut rx, _runtime) = engine_in(workspace.0.clone());
    let broker = engine.permission_broker();

    let first = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.decision_or_deny(PermissionAsk::new("Bash", json!({}))).await })
    };
    let second = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.decision_or_deny(PermissionAsk::new("Write", json!({}))).await })
    };

    pump_until(&mut engine, &mut rx, |e| {
        e.permission_request().is_some() && e.queued_permission_requests() == 1
    })
    .await;

    let presented = engine.permission_request().map(|r| r.tool_name.clone());
    engine.handle_input(InputEvent::PermissionKey(PermissionDecision::Deny));
    let next = engine.permission_request().map(|r| r.tool_name.clone());
    assert_ne!(presented, next);
    engine.handle_input(InputEvent::PermissionKey(PermissionDecision::Allow));
    assert!(engine.permission_request().is_none());

    let mut results = vec![first.await.unwrap(), second.await.unwrap()];
    results.sort_by_key(|d| *d == PermissionDecision::Allow);
    assert_eq!(results, [PermissionDecision::Deny, PermissionDecision::Allow]);
}

#[tokio::test]
async fn bypass_mode_skips_the_prompt_entirely() {
    let workspace = Workspace::new("bypass");
    let (mut engine, _rx, _runtime) = engine_in(workspace.0.clone());
    let broker = engine.permission_broker();

    engine.handle_input(InputEvent::CyclePermissionMode);
    engine.handle_input(InputEvent::CyclePermissionMode);
    assert_eq!(engine.permission_mode(), PermissionMode::BypassPermissions);

    let decision = broker
        .can_use_tool(PermissionAsk::new("Bash", json!({ "command": "rm -rf build" })))
        .await;
    assert_eq!(decision, Ok(PermissionDecision::Allow));
    assert!(engine.permission_request().is_none());
}

#[tokio::test]
async fn escape_aborts_loading_agent_call() {
    let workspace = Workspace::new("abort");
    let (mut engine, _rx, runtime) = engine_in(workspace.0.clone());
    type_text(&mut engine, "long task");
    engine.handle_input(InputEvent::Enter);
    assert!(engine.is_loading());

    engine.handle_input(InputEvent::Escape);
    assert!(!engine.is_loading());
    assert_eq!(*runtime.aborted.lock().unwrap(), 1);
}
