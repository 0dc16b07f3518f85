//! Observer that turns finished shell commands into transcript lines.

use pilot::session::observer::SessionObserver;
use pilot::session::process::ShellProcess;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::mpsc;

pub(crate) struct TranscriptObserver {
    transcript: mpsc::UnboundedSender<String>,
    reported: Mutex<HashSet<u64>>,
}

impl TranscriptObserver {
    pub(crate) fn new(transcript: mpsc::UnboundedSender<String>) -> Self {
        Self {
            transcript,
            reported: Mutex::new(HashSet::new()),
        }
    }
}

impl SessionObserver for TranscriptObserver {
    fn shell_updated(&self, process: &ShellProcess) {
        if process.running {
            return;
        }
        let Some(code) = process.exit_code else {
            return;
        };
        let first_report = self
            .reported
            .lock()
            .map(|mut seen| seen.insert(process.id))
            .unwrap_or(false);
        if !first_report {
            return;
        }
        for line in shell_transcript(process, code) {
            let _ = self.transcript.send(line);
        }
    }
}

/// Lines shown once a command has finished.
pub(crate) fn shell_transcript(process: &ShellProcess, code: i32) -> Vec<String> {
    let mut lines = vec![format!("$ {}", process.command)];
    lines.extend(process.stdout.lines().map(|line| format!("  {line}")));
    lines.extend(process.stderr.lines().map(|line| format!("  ! {line}")));
    if code != 0 {
        lines.push(format!("  [exit {code}]"));
    }
    lines
}
