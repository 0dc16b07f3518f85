//! Runtime-side half of the permission gate.

use crate::error::PermissionError;
use crate::session::events::{EngineMessage, PermissionPrompt};
use crate::session::permissions::{PermissionAsk, PermissionDecision, PermissionMode};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable handle the agent runtime uses to ask for tool permission.
#[derive(Clone, Debug)]
pub struct PermissionBroker {
    tx: mpsc::UnboundedSender<EngineMessage>,
    mode: watch::Receiver<PermissionMode>,
    edit_tools: Arc<Vec<String>>,
}

impl PermissionBroker {
    pub fn new(
        tx: mpsc::UnboundedSender<EngineMessage>,
        mode: watch::Receiver<PermissionMode>,
        edit_tools: Vec<String>,
    ) -> Self {
        Self {
            tx,
            mode,
            edit_tools: Arc::new(edit_tools),
        }
    }

    pub fn mode(&self) -> PermissionMode {
        *self.mode.borrow()
    }

    /// Decide whether the runtime may run `ask.tool_name`.
    ///
    /// Bypass mode allows everything; accept-edits allows configured edit
    /// tools. Anything else is queued for the user and awaited.
    pub async fn can_use_tool(
        &self,
        ask: PermissionAsk,
    ) -> Result<PermissionDecision, PermissionError> {
        match self.mode() {
            PermissionMode::BypassPermissions => return Ok(PermissionDecision::Allow),
            PermissionMode::AcceptEdits
                if self.edit_tools.iter().any(|tool| *tool == ask.tool_name) =>
            {
                return Ok(PermissionDecision::Allow);
            }
            _ => {}
        }

        let (responder, rx) = oneshot::channel();
        self.tx
            .send(EngineMessage::PermissionRequested(PermissionPrompt { ask, responder }))
            .map_err(|_| PermissionError::Unavailable)?;
        rx.await.map_err(|_| PermissionError::Cancelled)
    }

    /// [`Self::can_use_tool`] with every rejection treated as deny.
    pub async fn decision_or_deny(&self, ask: PermissionAsk) -> PermissionDecision {
        match self.can_use_tool(ask).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::info!(error = %err, "permission request rejected; denying tool");
                PermissionDecision::Deny
            }
        }
    }
}
