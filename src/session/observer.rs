//! Change-notification callbacks exposed to the rendering layer.

use crate::session::permissions::{ConfirmationRequest, PermissionMode};
use crate::session::process::ShellProcess;
use crate::session::submit::SubmitOutcome;
use crate::tui::overlay::OverlayState;

/// Receives synchronous notifications after each engine state change.
///
/// Every method has a no-op default so hosts implement only what they render.
pub trait SessionObserver: Send + Sync {
    fn text_changed(&self, _text: &str) {}
    fn cursor_changed(&self, _cursor: usize) {}
    fn overlay_changed(&self, _overlay: &OverlayState) {}
    fn shell_updated(&self, _process: &ShellProcess) {}
    fn permission_prompt_changed(&self, _request: Option<&ConfirmationRequest>) {}
    fn permission_mode_changed(&self, _mode: PermissionMode) {}
    fn loading_changed(&self, _loading: bool) {}
    /// The help surface opened or closed.
    fn modal_changed(&self, _open: bool) {}
    fn submitted(&self, _outcome: &SubmitOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
