//! Single-slot foreground shell command execution.

use crate::error::CommandError;
use crate::session::events::{EngineMessage, ExecutorEvent};
use crate::session::observer::SessionObserver;
use crate::session::process::{run_shell, ShellProcess, ShellSpawn, SIGNAL_EXIT_CODE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Resolves with the command's exit code once it finishes or is aborted.
#[derive(Debug)]
pub struct CommandCompletion {
    id: u64,
    rx: oneshot::Receiver<i32>,
}

impl CommandCompletion {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn wait(self) -> Result<i32, CommandError> {
        self.rx.await.map_err(|_| CommandError::Detached)
    }
}

struct ActiveCommand {
    id: u64,
    kill: oneshot::Sender<()>,
    done: oneshot::Sender<i32>,
}

/// Owns the in-flight shell process and the records of every command run.
///
/// Output and exit arrive asynchronously as [`EngineMessage::Shell`] events
/// and are folded in by [`CommandExecutor::apply`].
pub struct CommandExecutor {
    program: String,
    workdir: PathBuf,
    processes: Vec<ShellProcess>,
    active: Option<ActiveCommand>,
    next_id: u64,
    events: mpsc::UnboundedSender<EngineMessage>,
    observer: Arc<dyn SessionObserver>,
}

impl CommandExecutor {
    pub fn new(
        program: impl Into<String>,
        workdir: PathBuf,
        events: mpsc::UnboundedSender<EngineMessage>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            program: program.into(),
            workdir,
            processes: Vec::new(),
            active: None,
            next_id: 1,
            events,
            observer,
        }
    }

    /// Start `command` through the configured shell.
    ///
    /// Rejected without spawning anything while another command runs. Process
    /// failures are not errors here; they land in the record's exit code.
    /// Must be called from within a tokio runtime.
    pub fn execute_command(&mut self, command: &str) -> Result<CommandCompletion, CommandError> {
        if self.active.is_some() {
            tracing::warn!(command, "rejecting concurrent shell command");
            return Err(CommandError::AlreadyRunning {
                command: command.to_string(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        let (kill_tx, kill_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        self.active = Some(ActiveCommand {
            id,
            kill: kill_tx,
            done: done_tx,
        });
        self.processes.push(ShellProcess::started(id, command));
        if let Some(process) = self.processes.last() {
            self.observer.shell_updated(process);
        }

        let spawn = ShellSpawn {
            id,
            program: self.program.clone(),
            command: command.to_string(),
            workdir: self.workdir.clone(),
        };
        tokio::spawn(run_shell(spawn, kill_rx, self.events.clone()));
        Ok(CommandCompletion { id, rx: done_rx })
    }

    /// Fold one streamed event into its record.
    ///
    /// Records finalized by abort are frozen: late output is dropped and the
    /// exit only confirms it.
    pub fn apply(&mut self, event: ExecutorEvent) {
        match event {
            ExecutorEvent::Stdout { id, chunk } => {
                let Some(process) = self.live_record_mut(id) else {
                    return;
                };
                process.stdout.push_str(&chunk);
                self.notify(id);
            }
            ExecutorEvent::Stderr { id, chunk } => {
                let Some(process) = self.live_record_mut(id) else {
                    return;
                };
                process.stderr.push_str(&chunk);
                self.notify(id);
            }
            ExecutorEvent::Exited { id, code } => {
                let Some(process) = self.record_mut(id) else {
                    return;
                };
                if !process.running {
                    tracing::debug!(id, code, "exit confirmed for finalized command");
                    return;
                }
                process.running = false;
                process.exit_code = Some(code);
                if self.active.as_ref().is_some_and(|active| active.id == id) {
                    if let Some(active) = self.active.take() {
                        let _ = active.done.send(code);
                    }
                }
                self.notify(id);
            }
        }
    }

    /// Kill the running command and finalize its record immediately.
    ///
    /// Returns `false` when nothing is running.
    pub fn abort_command(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        tracing::info!(id = active.id, "aborting shell command");
        let _ = active.kill.send(());
        if let Some(process) = self.record_mut(active.id) {
            process.running = false;
            process.exit_code = Some(SIGNAL_EXIT_CODE);
        }
        let _ = active.done.send(SIGNAL_EXIT_CODE);
        self.notify(active.id);
        true
    }

    /// Directory for subsequent spawns. A running command is unaffected.
    pub fn update_workdir(&mut self, path: &Path) {
        tracing::debug!(path = %path.display(), "shell workdir updated");
        self.workdir = path.to_path_buf();
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Every record, oldest first.
    pub fn processes(&self) -> &[ShellProcess] {
        &self.processes
    }

    pub fn current(&self) -> Option<&ShellProcess> {
        let id = self.active.as_ref()?.id;
        self.processes.iter().find(|process| process.id == id)
    }

    fn record_mut(&mut self, id: u64) -> Option<&mut ShellProcess> {
        self.processes.iter_mut().rev().find(|process| process.id == id)
    }

    fn live_record_mut(&mut self, id: u64) -> Option<&mut ShellProcess> {
        self.record_mut(id).filter(|process| process.running)
    }

    fn notify(&self, id: u64) {
        if let Some(process) = self.processes.iter().rev().find(|process| process.id == id) {
            self.observer.shell_updated(process);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::observer::NoopObserver;
    use crate::testsupport::RecordingObserver;
    use tokio::time::{timeout, Duration};

    fn executor() -> (CommandExecutor, mpsc::UnboundedReceiver<EngineMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = CommandExecutor::new(
            "sh",
            std::env::temp_dir(),
            tx,
            Arc::new(NoopObserver),
        );
        (executor, rx)
    }

    /// Apply shell events until record `id` sees its exit event.
    async fn pump_until_exit(
        executor: &mut CommandExecutor,
        rx: &mut mpsc::UnboundedReceiver<EngineMessage>,
        id: u64,
    ) {
        loop {
            let message = timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("shell event timed out")
                .expect("event channel closed");
            if let EngineMessage::Shell(event) = message {
                let done = matches!(event, ExecutorEvent::Exited { id: exited, .. } if exited == id);
                executor.apply(event);
                if done {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn echo_records_output_and_exit_code() {
        let (mut executor, mut rx) = executor();
        let completion = executor.execute_command("echo hi").expect("start");
        let id = completion.id();
        assert!(executor.is_running());

        pump_until_exit(&mut executor, &mut rx, id).await;

        let process = &executor.processes()[0];
        assert_eq!(process.stdout, "hi\n");
        assert!(!process.running);
        assert_eq!(process.exit_code, Some(0));
        assert!(!executor.is_running());
        assert_eq!(completion.wait().await, Ok(0));
    }

    #[tokio::test]
    async fn non_zero_exit_is_recorded_not_raised() {
        let (mut executor, mut rx) = executor();
        let completion = executor.execute_command("exit 7").expect("start");
        pump_until_exit(&mut executor, &mut rx, completion.id()).await;
        assert_eq!(executor.processes()[0].exit_code, Some(7));
        assert_eq!(completion.wait().await, Ok(7));
    }

    #[tokio::test]
    async fn concurrent_execute_is_rejected() {
        let (mut executor, _rx) = executor();
        executor.execute_command("sleep 5").expect("start");
        let err = executor.execute_command("echo second").unwrap_err();
        assert_eq!(
            err,
            CommandError::AlreadyRunning {
                command: "echo second".into()
            }
        );
        assert_eq!(executor.processes().len(), 1);
        executor.abort_command();
    }

    #[tokio::test]
    async fn abort_finalizes_immediately_and_exit_is_a_no_op() {
        let (mut executor, mut rx) = executor();
        let completion = executor.execute_command("sleep 30").expect("start");
        let id = completion.id();

        assert!(executor.abort_command());
        let process = &executor.processes()[0];
        assert!(!process.running);
        assert_eq!(process.exit_code, Some(130));
        assert_eq!(completion.wait().await, Ok(130));

        // Second abort has nothing to kill.
        assert!(!executor.abort_command());

        // Left alone, sleep would hold the slot for 30s.
        timeout(
            Duration::from_secs(3),
            pump_until_exit(&mut executor, &mut rx, id),
        )
        .await
        .expect("killed process should exit promptly");
        assert_eq!(executor.processes()[0].exit_code, Some(130));
        assert!(!executor.processes()[0].running);
    }

    #[tokio::test]
    async fn aborted_command_never_reaches_its_next_step() {
        let (mut executor, mut rx) = executor();
        let dir = crate::testsupport::TestTempDir::new("abort-marker");
        executor.update_workdir(dir.path());
        let completion = executor
            .execute_command("sleep 1; touch marker")
            .expect("start");
        executor.abort_command();
        pump_until_exit(&mut executor, &mut rx, completion.id()).await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.child("marker").exists());
    }

    #[test]
    fn output_after_abort_is_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let observer = Arc::new(RecordingObserver::default());
        let mut executor = CommandExecutor::new("sh", std::env::temp_dir(), tx, observer.clone());
        executor.processes.push(ShellProcess::started(1, "yes"));
        executor.processes[0].running = false;
        executor.processes[0].exit_code = Some(SIGNAL_EXIT_CODE);

        executor.apply(ExecutorEvent::Stdout {
            id: 1,
            chunk: "y\n".into(),
        });
        executor.apply(ExecutorEvent::Stderr {
            id: 1,
            chunk: "late\n".into(),
        });
        assert_eq!(executor.processes()[0].stdout, "");
        assert_eq!(executor.processes()[0].stderr, "");
        assert_eq!(observer.counts().shell_updated, 0);
    }

    #[tokio::test]
    async fn abort_allows_next_command() {
        let (mut executor, mut rx) = executor();
        executor.execute_command("sleep 5").expect("start");
        executor.abort_command();
        let next = executor.execute_command("echo again").expect("start after abort");
        pump_until_exit(&mut executor, &mut rx, next.id()).await;
        assert_eq!(executor.processes().len(), 2);
        assert_eq!(executor.processes()[1].stdout, "again\n");
    }

    #[tokio::test]
    async fn workdir_applies_to_later_spawns() {
        let (mut executor, mut rx) = executor();
        let dir = crate::testsupport::TestTempDir::new("workdir");
        executor.update_workdir(dir.path());
        let completion = executor.execute_command("pwd").expect("start");
        pump_until_exit(&mut executor, &mut rx, completion.id()).await;
        let printed = executor.processes()[0].stdout.trim().to_string();
        let expected = std::fs::canonicalize(dir.path()).expect("canonical temp dir");
        assert_eq!(
            std::fs::canonicalize(printed).expect("canonical pwd"),
            expected
        );
    }
}
