//! Child-process plumbing for foreground shell commands.
//!
//! The spawned task streams stdout/stderr line by line as engine messages and
//! reports a single exit code. Signal names never leave this module: any
//! signal termination becomes [`SIGNAL_EXIT_CODE`].

use crate::session::events::{EngineMessage, ExecutorEvent};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

/// Exit code recorded for processes killed by a signal (or aborted).
pub const SIGNAL_EXIT_CODE: i32 = 130;
/// Exit code recorded when the process could not be spawned or waited on.
pub const SPAWN_ERROR_EXIT_CODE: i32 = 1;

/// Grandchildren may keep pipes open after the shell exits.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// One executed shell command and everything it printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProcess {
    pub id: u64,
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub running: bool,
    pub exit_code: Option<i32>,
}

impl ShellProcess {
    pub(super) fn started(id: u64, command: &str) -> Self {
        Self {
            id,
            command: command.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            running: true,
            exit_code: None,
        }
    }
}

/// Everything the spawned task needs to run one command.
#[derive(Debug, Clone)]
pub(super) struct ShellSpawn {
    pub id: u64,
    pub program: String,
    pub command: String,
    pub workdir: PathBuf,
}

/// Map a wait result to the session's exit-code convention.
pub fn exit_code_from_status(status: std::io::Result<ExitStatus>) -> i32 {
    match status {
        Ok(status) => status.code().unwrap_or(SIGNAL_EXIT_CODE),
        Err(_) => SPAWN_ERROR_EXIT_CODE,
    }
}

/// Run `<program> -c <command>` until it exits or `kill_rx` fires.
pub(super) async fn run_shell(
    spawn: ShellSpawn,
    mut kill_rx: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<EngineMessage>,
) {
    let id = spawn.id;
    let mut cmd = Command::new(&spawn.program);
    // Dropping the task (engine shutdown) must not leave the child behind.
    cmd.kill_on_drop(true);
    cmd.arg("-c")
        .arg(&spawn.command)
        .current_dir(&spawn.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(id, program = %spawn.program, error = %err, "shell spawn failed");
            send(
                &events,
                ExecutorEvent::Stderr {
                    id,
                    chunk: format!("{}: {err}\n", spawn.program),
                },
            );
            send(
                &events,
                ExecutorEvent::Exited {
                    id,
                    code: SPAWN_ERROR_EXIT_CODE,
                },
            );
            return;
        }
    };
    tracing::info!(id, pid = ?child.id(), command = %spawn.command, "shell command started");

    let stdout_reader = child
        .stdout
        .take()
        .map(|out| tokio::spawn(pump_lines(out, id, events.clone(), StreamKind::Stdout)));
    let stderr_reader = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump_lines(err, id, events.clone(), StreamKind::Stderr)));

    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut kill_rx => {
            tracing::info!(id, "killing shell command");
            if let Err(err) = child.start_kill() {
                tracing::debug!(id, error = %err, "kill failed; process already gone");
            }
            child.wait().await
        }
    };

    drain(stdout_reader).await;
    drain(stderr_reader).await;

    let code = exit_code_from_status(status);
    tracing::info!(id, code, "shell command exited");
    send(&events, ExecutorEvent::Exited { id, code });
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

async fn pump_lines<R>(
    stream: R,
    id: u64,
    events: mpsc::UnboundedSender<EngineMessage>,
    kind: StreamKind,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf).into_owned();
                let event = match kind {
                    StreamKind::Stdout => ExecutorEvent::Stdout { id, chunk },
                    StreamKind::Stderr => ExecutorEvent::Stderr { id, chunk },
                };
                send(&events, event);
            }
            Err(err) => {
                tracing::debug!(id, ?kind, error = %err, "shell stream read failed");
                break;
            }
        }
    }
}

async fn drain(reader: Option<JoinHandle<()>>) {
    let Some(handle) = reader else {
        return;
    };
    if timeout(READER_DRAIN_TIMEOUT, handle).await.is_err() {
        tracing::debug!("shell output reader still open after exit");
    }
}

fn send(events: &mpsc::UnboundedSender<EngineMessage>, event: ExecutorEvent) {
    // The engine may already be gone during shutdown.
    let _ = events.send(EngineMessage::Shell(event));
}
