//! Stand-in agent runtime for the interactive binary.
//!
//! Messages are echoed back after passing through the permission gate, which
//! is enough to drive every engine surface from a real terminal.

use pilot::runtime::{AgentRuntime, PermissionBroker};
use pilot::session::attachments::ImageAttachment;
use pilot::session::events::EngineMessage;
use pilot::session::permissions::{PermissionAsk, PermissionMode};
use pilot::tui::commands::SlashCommand;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tool name the echo runtime asks permission for.
pub(crate) const ECHO_TOOL: &str = "Echo";

/// Channels that exist only once the engine is built.
struct Wiring {
    broker: PermissionBroker,
    engine: mpsc::UnboundedSender<EngineMessage>,
}

pub(crate) struct EchoRuntime {
    wiring: OnceLock<Wiring>,
    transcript: mpsc::UnboundedSender<String>,
    plugin_dirs: Vec<PathBuf>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl EchoRuntime {
    pub(crate) fn new(transcript: mpsc::UnboundedSender<String>, plugin_dirs: Vec<PathBuf>) -> Self {
        Self {
            wiring: OnceLock::new(),
            transcript,
            plugin_dirs,
            in_flight: Mutex::new(None),
        }
    }

    /// Connect to the engine. Later calls are ignored.
    pub(crate) fn attach(
        &self,
        broker: PermissionBroker,
        engine: mpsc::UnboundedSender<EngineMessage>,
    ) {
        if self.wiring.set(Wiring { broker, engine }).is_err() {
            tracing::debug!("echo runtime already attached");
        }
    }

    fn say(&self, line: impl Into<String>) {
        let _ = self.transcript.send(line.into());
    }

    fn notify_engine(&self, message: EngineMessage) {
        if let Some(wiring) = self.wiring.get() {
            let _ = wiring.engine.send(message);
        }
    }

    fn take_in_flight(&self) -> Option<JoinHandle<()>> {
        self.in_flight.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl AgentRuntime for EchoRuntime {
    fn send_message(&self, text: String, images: Vec<ImageAttachment>) {
        let Some(wiring) = self.wiring.get() else {
            self.say("runtime not attached");
            self.notify_engine(EngineMessage::LoadingChanged(false));
            return;
        };
        self.say(format!("> {text}"));
        for image in &images {
            self.say(format!("  attached {} ({})", image.path.display(), image.mime_type));
        }

        let broker = wiring.broker.clone();
        let engine = wiring.engine.clone();
        let transcript = self.transcript.clone();
        let handle = tokio::spawn(async move {
            let ask = PermissionAsk::new(
                ECHO_TOOL,
                json!({ "text": text, "images": images.len() }),
            );
            let decision = broker.decision_or_deny(ask).await;
            let line = if decision.is_allowed() {
                format!("echo: {text}")
            } else {
                "echo: permission denied".to_string()
            };
            let _ = transcript.send(line);
            let _ = engine.send(EngineMessage::LoadingChanged(false));
        });

        if let Some(previous) = self
            .in_flight
            .lock()
            .ok()
            .and_then(|mut slot| slot.replace(handle))
        {
            previous.abort();
        }
    }

    fn abort(&self) {
        if let Some(handle) = self.take_in_flight() {
            handle.abort();
            self.say("echo: aborted");
        }
    }

    fn has_slash_command(&self, name: &str) -> bool {
        matches!(name, "mode" | "plugins")
    }

    fn slash_commands(&self) -> Vec<SlashCommand> {
        vec![
            SlashCommand::new("mode", "Set the permission mode"),
            SlashCommand::new("plugins", "List plugin directories"),
        ]
    }

    fn run_slash_command(&self, name: &str, args: &str) {
        match name {
            "mode" => match args.trim().parse::<PermissionMode>() {
                Ok(mode) => self.notify_engine(EngineMessage::PermissionModePushed(mode)),
                Err(err) => self.say(format!("mode: {err}")),
            },
            "plugins" if self.plugin_dirs.is_empty() => self.say("no plugin directories"),
            "plugins" => {
                for dir in &self.plugin_dirs {
                    self.say(format!("plugin dir: {}", dir.display()));
                }
            }
            other => self.say(format!("unknown command /{other}")),
        }
    }

    fn add_memory(&self, text: String) {
        tracing::info!(chars = text.chars().count(), "memory noted");
        self.say(format!("noted: {text}"));
    }

    fn permission_mode_changed(&self, mode: PermissionMode) {
        self.say(format!("permission mode: {mode}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot::session::permissions::PermissionDecision;
    use tokio::sync::watch;

    fn runtime() -> (EchoRuntime, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EchoRuntime::new(tx, vec![PathBuf::from("/opt/plugins")]), rx)
    }

    #[tokio::test]
    async fn message_is_echoed_after_permission_allow() {
        let (runtime, mut transcript) = runtime();
        let (engine_tx, mut engine_rx) = mpsc::unbounded_channel();
        let (_mode_tx, mode_rx) = watch::channel(PermissionMode::Default);
        runtime.attach(
            PermissionBroker::new(engine_tx.clone(), mode_rx, Vec::new()),
            engine_tx,
        );

        runtime.send_message("hi".into(), Vec::new());
        assert_eq!(transcript.recv().await.as_deref(), Some("> hi"));

        let Some(EngineMessage::PermissionRequested(prompt)) = engine_rx.recv().await else {
            panic!("expected permission prompt");
        };
        assert_eq!(prompt.ask.tool_name, ECHO_TOOL);
        prompt.responder.send(PermissionDecision::Allow).unwrap();

        assert_eq!(transcript.recv().await.as_deref(), Some("echo: hi"));
        assert!(matches!(
            engine_rx.recv().await,
            Some(EngineMessage::LoadingChanged(false))
        ));
    }

    #[tokio::test]
    async fn mode_command_pushes_mode_to_engine() {
        let (runtime, _transcript) = runtime();
        let (engine_tx, mut engine_rx) = mpsc::unbounded_channel();
        let (_mode_tx, mode_rx) = watch::channel(PermissionMode::Default);
        runtime.attach(
            PermissionBroker::new(engine_tx.clone(), mode_rx, Vec::new()),
            engine_tx,
        );

        runtime.run_slash_command("mode", "accept-edits");
        assert!(matches!(
            engine_rx.try_recv(),
            Ok(EngineMessage::PermissionModePushed(PermissionMode::AcceptEdits))
        ));
    }

    #[test]
    fn registry_knows_bare_names() {
        let (runtime, mut transcript) = runtime();
        assert!(runtime.has_slash_command("plugins"));
        assert!(!runtime.has_slash_command("/plugins"));
        runtime.run_slash_command("plugins", "");
        assert_eq!(transcript.try_recv().as_deref(), Ok("plugin dir: /opt/plugins"));
    }
}
