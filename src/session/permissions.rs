//! Serialized tool-permission prompts.
//!
//! Requests raised concurrently by the agent runtime are queued FIFO. Exactly
//! one is presented at a time; deciding or cancelling it promotes the next.
//! Each request carries a oneshot sender. Cancellation drops the sender, so
//! the waiting side observes `PermissionError::Cancelled`.

use crate::error::PermissionError;
use crate::session::observer::SessionObserver;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Process-wide tool-permission mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionMode {
    #[default]
    Default,
    AcceptEdits,
    BypassPermissions,
}

impl PermissionMode {
    /// Next mode in the Shift+Tab cycle.
    pub fn cycle(self) -> Self {
        match self {
            Self::Default => Self::AcceptEdits,
            Self::AcceptEdits => Self::BypassPermissions,
            Self::BypassPermissions => Self::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "accept-edits",
            Self::BypassPermissions => "bypass-permissions",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "accept-edits" | "acceptedits" => Ok(Self::AcceptEdits),
            "bypass-permissions" | "bypasspermissions" | "bypass" => Ok(Self::BypassPermissions),
            other => Err(format!("unknown permission mode `{other}`")),
        }
    }
}

/// The user's answer to a presented request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    AllowAlways,
    Deny,
}

impl PermissionDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow | Self::AllowAlways)
    }
}

/// What the runtime asks permission for.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionAsk {
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub suggested_prefix: Option<String>,
    pub hide_persistent_option: bool,
}

impl PermissionAsk {
    pub fn new(tool_name: impl Into<String>, tool_input: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_input,
            suggested_prefix: None,
            hide_persistent_option: false,
        }
    }
}

/// A queued or presented request, as the rendering layer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationRequest {
    pub id: u64,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub suggested_prefix: Option<String>,
    pub hide_persistent_option: bool,
}

struct PendingRequest {
    request: ConfirmationRequest,
    responder: oneshot::Sender<PermissionDecision>,
}

/// Awaitable result of [`PermissionArbiter::request`].
#[derive(Debug)]
pub struct DecisionHandle {
    id: u64,
    rx: oneshot::Receiver<PermissionDecision>,
}

impl DecisionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait until the user decides. A cancelled request resolves to
    /// `Err(PermissionError::Cancelled)`.
    pub async fn wait(self) -> Result<PermissionDecision, PermissionError> {
        self.rx.await.map_err(|_| PermissionError::Cancelled)
    }

    /// Non-blocking poll. `None` while still pending.
    pub fn try_result(&mut self) -> Option<Result<PermissionDecision, PermissionError>> {
        match self.rx.try_recv() {
            Ok(decision) => Some(Ok(decision)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(PermissionError::Cancelled)),
        }
    }
}

/// FIFO queue of approval requests with a single presented slot.
pub struct PermissionArbiter {
    queue: VecDeque<PendingRequest>,
    current: Option<PendingRequest>,
    next_id: u64,
    observer: Arc<dyn SessionObserver>,
}

impl PermissionArbiter {
    pub fn new(observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            next_id: 1,
            observer,
        }
    }

    /// Queue a request and return a handle resolving with the decision.
    pub fn request(&mut self, ask: PermissionAsk) -> DecisionHandle {
        let (tx, rx) = oneshot::channel();
        let id = self.enqueue(ask, tx);
        DecisionHandle { id, rx }
    }

    /// Queue a request whose responder was created elsewhere.
    pub fn enqueue(
        &mut self,
        ask: PermissionAsk,
        responder: oneshot::Sender<PermissionDecision>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let request = ConfirmationRequest {
            id,
            tool_name: ask.tool_name,
            tool_input: ask.tool_input,
            suggested_prefix: ask.suggested_prefix,
            hide_persistent_option: ask.hide_persistent_option,
        };
        tracing::debug!(id, tool = %request.tool_name, queued = self.queue.len(), "permission request queued");
        self.queue.push_back(PendingRequest { request, responder });
        if self.current.is_none() {
            self.promote_next();
        }
        id
    }

    /// The presented request, if any.
    pub fn current(&self) -> Option<&ConfirmationRequest> {
        self.current.as_ref().map(|pending| &pending.request)
    }

    pub fn is_presenting(&self) -> bool {
        self.current.is_some()
    }

    /// Requests waiting behind the presented one.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Resolve the presented request. Returns `false` when nothing is
    /// presented.
    pub fn decide(&mut self, decision: PermissionDecision) -> bool {
        let Some(pending) = self.current.take() else {
            return false;
        };
        tracing::info!(id = pending.request.id, tool = %pending.request.tool_name, ?decision, "permission decided");
        if pending.responder.send(decision).is_err() {
            tracing::debug!(id = pending.request.id, "permission requester went away");
        }
        self.promote_next();
        true
    }

    /// Reject the presented request. Returns `false` when nothing is
    /// presented.
    pub fn cancel(&mut self) -> bool {
        let Some(pending) = self.current.take() else {
            return false;
        };
        tracing::info!(id = pending.request.id, tool = %pending.request.tool_name, "permission cancelled");
        drop(pending.responder);
        self.promote_next();
        true
    }

    /// Reject everything, presented and queued.
    pub fn cancel_all(&mut self) {
        let dropped = self.queue.len() + usize::from(self.current.is_some());
        self.queue.clear();
        if self.current.take().is_some() {
            self.observer.permission_prompt_changed(None);
        }
        if dropped > 0 {
            tracing::info!(dropped, "all permission requests cancelled");
        }
    }

    /// Drop the presented request if its requester already gave up and
    /// promote the next live one. Returns `true` when a request was dropped.
    pub fn drop_abandoned(&mut self) -> bool {
        if !self
            .current
            .as_ref()
            .is_some_and(|pending| pending.responder.is_closed())
        {
            return false;
        }
        if let Some(pending) = self.current.take() {
            tracing::debug!(id = pending.request.id, "presented permission request abandoned");
        }
        self.promote_next();
        true
    }

    /// Present the next live request. Entries whose requester already gave
    /// up are discarded.
    fn promote_next(&mut self) {
        while let Some(pending) = self.queue.pop_front() {
            if pending.responder.is_closed() {
                tracing::debug!(id = pending.request.id, "skipping abandoned permission request");
                continue;
            }
            tracing::debug!(id = pending.request.id, tool = %pending.request.tool_name, "permission request presented");
            self.current = Some(pending);
            self.observer.permission_prompt_changed(self.current());
            return;
        }
        self.observer.permission_prompt_changed(None);
    }
}

impl fmt::Debug for PermissionArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionArbiter")
            .field("current", &self.current())
            .field("queued", &self.queue.len())
            .finish()
    }
}
