//! Interactive session engine.
//!
//! [`SessionEngine`] owns the line editor, overlays, history, shell executor,
//! and permission queue. It is driven from one task: the host feeds it
//! [`InputEvent`]s from the terminal and [`EngineMessage`]s from the channel
//! returned by [`SessionEngine::new`]. Nothing inside is shared across
//! threads; ordering of those two streams is the only synchronization.
//!
//! Input precedence, first match wins:
//! 1. a presented permission prompt takes Esc (cancel) and Alt+Y/A/N;
//! 2. an active overlay takes navigation, selection, and Esc;
//! 3. history search takes typing and Backspace into its query;
//! 4. the help surface swallows everything but Esc;
//! 5. Esc while loading or running a command aborts one of them;
//! 6. Shift+Tab cycles the permission mode;
//! 7. everything else edits the buffer, navigates history, or submits.

pub mod attachments;
pub mod events;
pub mod executor;
mod lookup;
pub mod observer;
pub mod permissions;
pub mod process;
pub mod submit;

use crate::config::Config;
use crate::runtime::{AgentRuntime, PermissionBroker};
use crate::tui::commands::{builtin_commands, BuiltinCommand, SlashCommand};
use crate::tui::compression::CompressionCache;
use crate::tui::history::{Direction, HistoryNavigator};
use crate::tui::overlay::{LookupRequest, OverlayKind, OverlaySelector, OverlayState};
use crate::tui::search::{CandidateSource, CommandSearch, FileSearch, HistorySearch};
use crate::tui::text_buffer::TextBuffer;
use attachments::{pasted_image_path, AttachmentList, AttachmentPolicy, ImageAttachment};
use events::{EngineMessage, InputEvent};
use executor::CommandExecutor;
use lookup::LookupScheduler;
use observer::SessionObserver;
use permissions::{ConfirmationRequest, PermissionArbiter, PermissionDecision, PermissionMode};
use process::ShellProcess;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use submit::{classify, SubmitOutcome};
use tokio::sync::{mpsc, watch};

/// Static engine configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub workdir: PathBuf,
    pub shell_program: String,
    pub compression_threshold: usize,
    pub search_debounce: Duration,
    pub max_candidates: usize,
    pub history_limit: usize,
    /// Where history is loaded from and saved to. `None` keeps it in memory.
    pub history_path: Option<PathBuf>,
    pub permission_mode: PermissionMode,
    pub edit_tools: Vec<String>,
    pub attachment_policy: AttachmentPolicy,
    pub plugin_dirs: Vec<PathBuf>,
}

impl EngineOptions {
    pub fn from_config(config: &Config, workdir: PathBuf) -> Self {
        Self {
            workdir,
            shell_program: config.shell.program.clone(),
            compression_threshold: config.editor.compression_threshold,
            search_debounce: Duration::from_millis(config.editor.search_debounce_ms),
            max_candidates: config.editor.max_candidates,
            history_limit: config.editor.history_limit,
            history_path: None,
            permission_mode: config.permissions.mode,
            edit_tools: config.permissions.edit_tools.clone(),
            attachment_policy: config.attachments.policy,
            plugin_dirs: Vec::new(),
        }
    }
}

pub struct SessionEngine {
    options: EngineOptions,
    buffer: TextBuffer,
    compression: CompressionCache,
    overlay: OverlaySelector,
    history: HistoryNavigator,
    executor: CommandExecutor,
    permissions: PermissionArbiter,
    attachments: AttachmentList,
    lookups: LookupScheduler,
    file_source: Arc<dyn CandidateSource>,
    runtime: Arc<dyn AgentRuntime>,
    observer: Arc<dyn SessionObserver>,
    mode: watch::Sender<PermissionMode>,
    events: mpsc::UnboundedSender<EngineMessage>,
    loading: bool,
    modal: bool,
}

impl SessionEngine {
    /// Build an engine. The returned receiver carries messages from tasks the
    /// engine spawns and from the runtime; the host feeds them back through
    /// [`SessionEngine::handle_message`].
    pub fn new(
        options: EngineOptions,
        runtime: Arc<dyn AgentRuntime>,
        observer: Arc<dyn SessionObserver>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineMessage>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (mode, _) = watch::channel(options.permission_mode);

        let mut history = HistoryNavigator::new(options.history_limit);
        if let Some(path) = &options.history_path {
            if let Err(err) = history.load_file(path) {
                tracing::warn!(path = %path.display(), error = %err, "failed to load input history");
            }
        }

        let engine = Self {
            buffer: TextBuffer::new(observer.clone()),
            compression: CompressionCache::new(options.compression_threshold),
            overlay: OverlaySelector::default(),
            history,
            executor: CommandExecutor::new(
                options.shell_program.clone(),
                options.workdir.clone(),
                events.clone(),
                observer.clone(),
            ),
            permissions: PermissionArbiter::new(observer.clone()),
            attachments: AttachmentList::default(),
            lookups: LookupScheduler::new(options.search_debounce, events.clone()),
            file_source: Arc::new(FileSearch::new(
                options.workdir.clone(),
                options.max_candidates,
            )),
            runtime,
            observer,
            mode,
            events,
            loading: false,
            modal: false,
            options,
        };
        tracing::info!(
            workdir = %engine.options.workdir.display(),
            mode = %engine.options.permission_mode,
            plugin_dirs = engine.options.plugin_dirs.len(),
            "session engine ready"
        );
        (engine, rx)
    }

    /// Replace the file-completion source.
    pub fn with_file_source(mut self, source: Arc<dyn CandidateSource>) -> Self {
        self.file_source = source;
        self
    }

    /// Handle the runtime uses for tool-permission questions.
    pub fn permission_broker(&self) -> PermissionBroker {
        PermissionBroker::new(
            self.events.clone(),
            self.mode.subscribe(),
            self.options.edit_tools.clone(),
        )
    }

    /// Sender for runtime-originated messages (loading, mode pushes).
    pub fn message_sender(&self) -> mpsc::UnboundedSender<EngineMessage> {
        self.events.clone()
    }

    // -- read accessors ----------------------------------------------------

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn overlay(&self) -> &OverlayState {
        self.overlay.state()
    }

    pub fn selected_candidate_index(&self) -> Option<usize> {
        self.overlay.state().selected_index()
    }

    pub fn shell_processes(&self) -> &[ShellProcess] {
        self.executor.processes()
    }

    pub fn is_command_running(&self) -> bool {
        self.executor.is_running()
    }

    pub fn permission_request(&self) -> Option<&ConfirmationRequest> {
        self.permissions.current()
    }

    pub fn queued_permission_requests(&self) -> usize {
        self.permissions.queued_len()
    }

    pub fn permission_mode(&self) -> PermissionMode {
        *self.mode.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_modal(&self) -> bool {
        self.modal
    }

    pub fn attachments(&self) -> &[ImageAttachment] {
        self.attachments.items()
    }

    pub fn history(&self) -> &HistoryNavigator {
        &self.history
    }

    /// Built-in commands followed by the runtime's registry.
    pub fn command_catalog(&self) -> Vec<SlashCommand> {
        let mut commands = builtin_commands();
        for command in self.runtime.slash_commands() {
            if !commands.iter().any(|known| known.name == command.name) {
                commands.push(command);
            }
        }
        commands
    }

    // -- input -------------------------------------------------------------

    /// Dispatch one input event. Returns the submit outcome when the event
    /// submitted (or tried to submit) the buffer.
    pub fn handle_input(&mut self, event: InputEvent) -> Option<SubmitOutcome> {
        self.notifying_overlay(|engine| engine.dispatch(event))
    }

    /// Commit `value` in the active file or history overlay, as if it were
    /// highlighted and accepted. Returns `false` when neither is active.
    pub fn select_candidate(&mut self, value: &str) -> bool {
        self.notifying_overlay(|engine| engine.commit_value(value))
    }

    /// Run `name` from the active command overlay: the buffer is replaced by
    /// `/name` and submitted.
    pub fn select_command_execute(&mut self, name: &str) -> Option<SubmitOutcome> {
        self.notifying_overlay(|engine| engine.commit_command_execute(name))
    }

    /// Put `/name ` in the buffer for further editing.
    pub fn select_command_insert(&mut self, name: &str) -> bool {
        self.notifying_overlay(|engine| engine.commit_command_insert(name))
    }

    /// Run `f` and report an overlay change once if the state moved.
    fn notifying_overlay<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let overlay_before = self.overlay.state().clone();
        let out = f(self);
        if *self.overlay.state() != overlay_before {
            self.observer.overlay_changed(self.overlay.state());
        }
        out
    }

    fn dispatch(&mut self, event: InputEvent) -> Option<SubmitOutcome> {
        self.permissions.drop_abandoned();
        if self.permissions.is_presenting() {
            match event {
                InputEvent::Escape => {
                    self.permissions.cancel();
                    return None;
                }
                InputEvent::PermissionKey(decision) => {
                    self.decide_permission(decision);
                    return None;
                }
                _ => {}
            }
        }

        if self.overlay.is_active() {
            if let Some(outcome) = self.handle_overlay_event(&event) {
                return outcome;
            }
        }

        if self.modal {
            if event == InputEvent::Escape {
                self.set_modal(false);
            }
            return None;
        }

        if event == InputEvent::Escape && (self.loading || self.executor.is_running()) {
            self.abort_active();
            return None;
        }

        if event == InputEvent::CyclePermissionMode {
            let next = self.permission_mode().cycle();
            self.set_permission_mode(next);
            self.runtime.permission_mode_changed(next);
            return None;
        }

        self.edit(event)
    }

    /// `Some(outcome)` when the overlay consumed the event.
    fn handle_overlay_event(&mut self, event: &InputEvent) -> Option<Option<SubmitOutcome>> {
        let kind = self.overlay.kind()?;
        match event {
            InputEvent::Up => self.overlay.move_selection(-1),
            InputEvent::Down => self.overlay.move_selection(1),
            InputEvent::Escape => self.overlay.dismiss(),
            InputEvent::HistorySearch => {
                let request = self.overlay.open_history_search();
                self.schedule_lookup(request);
            }
            InputEvent::Tab => return self.commit_candidate(kind, true),
            InputEvent::Enter => return self.commit_candidate(kind, false),
            InputEvent::Char(ch) if kind == OverlayKind::History => {
                let request = self.overlay.history_query_push(&ch.to_string());
                self.schedule_lookup_opt(request);
            }
            InputEvent::Paste(text) if kind == OverlayKind::History => {
                let request = self.overlay.history_query_push(text);
                self.schedule_lookup_opt(request);
            }
            InputEvent::Backspace if kind == OverlayKind::History => {
                let request = self.overlay.history_query_pop();
                self.schedule_lookup_opt(request);
            }
            _ => return None,
        }
        Some(None)
    }

    /// Tab (`insert`) or Enter on the highlighted candidate. With nothing
    /// highlighted the overlay closes and the key falls through.
    fn commit_candidate(&mut self, kind: OverlayKind, insert: bool) -> Option<Option<SubmitOutcome>> {
        let Some(value) = self.overlay.selected().map(|candidate| candidate.value.clone()) else {
            self.overlay.dismiss();
            return None;
        };
        if kind != OverlayKind::Command {
            self.commit_value(&value);
            return Some(None);
        }
        if !insert && self.is_executable_command(&value) {
            return Some(self.commit_command_execute(&value));
        }
        self.commit_command_insert(&value);
        Some(None)
    }

    fn is_executable_command(&self, name: &str) -> bool {
        let bare = name.trim_start_matches('/');
        builtin_commands()
            .iter()
            .any(|cmd| cmd.name.trim_start_matches('/') == bare)
            || self.runtime.has_slash_command(bare)
    }

    fn commit_value(&mut self, value: &str) -> bool {
        let selection = match self.overlay.kind() {
            Some(OverlayKind::File) => {
                self.overlay
                    .select_file(value, self.buffer.text(), self.buffer.cursor())
            }
            Some(OverlayKind::History) => {
                self.history.reset_navigation();
                self.overlay.accept_history(value)
            }
            _ => None,
        };
        let Some(selection) = selection else {
            return false;
        };
        self.lookups.cancel();
        self.buffer.set_text(&selection.text, selection.cursor);
        true
    }

    fn commit_command_execute(&mut self, name: &str) -> Option<SubmitOutcome> {
        let command = self.overlay.select_command_execute(name)?;
        self.lookups.cancel();
        let len = command.chars().count();
        self.buffer.set_text(&command, len);
        Some(self.handle_submit())
    }

    fn commit_command_insert(&mut self, name: &str) -> bool {
        let Some(selection) = self.overlay.select_command_insert(name) else {
            return false;
        };
        self.lookups.cancel();
        self.buffer.set_text(&selection.text, selection.cursor);
        true
    }

    fn edit(&mut self, event: InputEvent) -> Option<SubmitOutcome> {
        match event {
            InputEvent::Char(ch) => self.insert_text(&ch.to_string()),
            InputEvent::Newline => self.insert_text("\n"),
            InputEvent::Paste(text) => self.paste(&text),
            InputEvent::Enter => return Some(self.handle_submit()),
            InputEvent::Backspace => self.edited(|buffer| {
                buffer.delete_before_cursor();
            }),
            InputEvent::Delete => self.edited(|buffer| {
                buffer.delete_at_cursor();
            }),
            InputEvent::DeleteWordBackward => self.edited(TextBuffer::delete_word_before_cursor),
            InputEvent::KillToLineEnd => self.edited(TextBuffer::kill_to_line_end),
            InputEvent::KillToLineStart => self.edited(TextBuffer::kill_to_line_start),
            InputEvent::Left => self.moved(TextBuffer::move_left),
            InputEvent::Right => self.moved(TextBuffer::move_right),
            InputEvent::Home => self.moved(TextBuffer::move_start),
            InputEvent::End => self.moved(TextBuffer::move_end),
            InputEvent::LineStart => self.moved(TextBuffer::move_line_start),
            InputEvent::LineEnd => self.moved(TextBuffer::move_line_end),
            InputEvent::Up => self.navigate_history(Direction::Up),
            InputEvent::Down => self.navigate_history(Direction::Down),
            InputEvent::HistorySearch => {
                let request = self.overlay.open_history_search();
                self.schedule_lookup(request);
            }
            InputEvent::Tab
            | InputEvent::Escape
            | InputEvent::CyclePermissionMode
            | InputEvent::PermissionKey(_) => {}
        }
        None
    }

    fn insert_text(&mut self, text: &str) {
        self.buffer.insert_at_cursor(text);
        self.history.reset_navigation();
        let request = self
            .overlay
            .after_insert(text, self.buffer.text(), self.buffer.cursor());
        self.schedule_lookup_opt(request);
    }

    fn edited(&mut self, op: impl FnOnce(&mut TextBuffer)) {
        op(&mut self.buffer);
        self.history.reset_navigation();
        let request = self.overlay.after_edit(self.buffer.text(), self.buffer.cursor());
        self.schedule_lookup_opt(request);
    }

    fn moved(&mut self, op: impl FnOnce(&mut TextBuffer)) {
        op(&mut self.buffer);
        let request = self.overlay.after_edit(self.buffer.text(), self.buffer.cursor());
        self.schedule_lookup_opt(request);
    }

    fn navigate_history(&mut self, direction: Direction) {
        if let Some(step) = self.history.navigate(direction, self.buffer.text()) {
            self.buffer.set_text(&step.text, step.cursor);
        }
    }

    /// Insert pasted text: an image path becomes an attachment, long text
    /// becomes a `[LongText#N]` placeholder.
    fn paste(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        if let Some(path) = pasted_image_path(&text) {
            self.attach_image(&path);
            return;
        }
        if self.compression.should_compress(&text) {
            let token = self.compression.compress(&text);
            self.insert_text(&token);
            return;
        }
        self.insert_text(&text);
    }

    /// Attach an image and insert its placeholder at the cursor.
    ///
    /// Returns the attachment id, or `None` for unsupported file types.
    pub fn attach_image(&mut self, path: &Path) -> Option<u64> {
        let (id, placeholder) = {
            let attachment = self.attachments.add(path)?;
            (attachment.id, attachment.placeholder())
        };
        self.insert_text(&placeholder);
        Some(id)
    }

    /// Drop an attachment. Its placeholder text stays in the buffer.
    pub fn remove_attachment(&mut self, id: u64) -> Option<ImageAttachment> {
        self.attachments.remove(id)
    }

    /// Route the buffer contents.
    pub fn handle_submit(&mut self) -> SubmitOutcome {
        let raw = self.buffer.text().to_string();
        let expanded = self.compression.expand(&raw);
        if expanded.trim().is_empty()
            && !self
                .attachments
                .any_for_submit(&expanded, self.options.attachment_policy)
        {
            return SubmitOutcome::Empty;
        }
        if self.loading || self.executor.is_running() {
            tracing::debug!(
                loading = self.loading,
                running = self.executor.is_running(),
                "submit deferred while busy"
            );
            let outcome = SubmitOutcome::Busy;
            self.observer.submitted(&outcome);
            return outcome;
        }

        let runtime = self.runtime.clone();
        let mut outcome = classify(&expanded, |name| runtime.has_slash_command(name));
        if outcome == SubmitOutcome::Empty {
            return outcome;
        }
        if let SubmitOutcome::Message { images, .. } = &mut outcome {
            *images = self
                .attachments
                .take_for_submit(&expanded, self.options.attachment_policy);
        }

        self.history.push(&raw);
        self.history.reset_navigation();
        self.attachments.clear();
        self.overlay.dismiss();
        self.lookups.cancel();
        self.buffer.clear();

        tracing::info!(route = route_name(&outcome), "input submitted");
        match &outcome {
            SubmitOutcome::Empty | SubmitOutcome::Busy => {}
            SubmitOutcome::Shell(command) => {
                if let Err(err) = self.executor.execute_command(command) {
                    tracing::warn!(error = %err, "shell command rejected");
                }
            }
            SubmitOutcome::Memory(note) => self.runtime.add_memory(note.clone()),
            SubmitOutcome::Builtin(BuiltinCommand::Help) => self.set_modal(true),
            SubmitOutcome::Builtin(BuiltinCommand::Clear) => {
                self.compression.clear();
            }
            SubmitOutcome::Builtin(BuiltinCommand::Quit) => {}
            SubmitOutcome::SlashCommand { name, args } => self.runtime.run_slash_command(name, args),
            SubmitOutcome::Message { text, images } => {
                self.set_loading(true);
                self.runtime.send_message(text.clone(), images.clone());
            }
        }
        self.observer.submitted(&outcome);
        outcome
    }

    // -- background messages -------------------------------------------------

    pub fn handle_message(&mut self, message: EngineMessage) {
        self.permissions.drop_abandoned();
        match message {
            EngineMessage::LookupFinished { generation, result } => {
                if self.overlay.apply_results(generation, result) {
                    self.observer.overlay_changed(self.overlay.state());
                }
            }
            EngineMessage::Shell(event) => self.executor.apply(event),
            EngineMessage::PermissionRequested(prompt) => {
                self.permissions.enqueue(prompt.ask, prompt.responder);
            }
            EngineMessage::PermissionModePushed(mode) => {
                tracing::info!(%mode, "permission mode set by runtime");
                self.set_permission_mode(mode);
            }
            EngineMessage::LoadingChanged(loading) => self.set_loading(loading),
        }
    }

    // -- session actions -----------------------------------------------------

    /// Answer the presented permission prompt. `AllowAlways` is downgraded
    /// to `Allow` when the prompt hides the persistent option.
    pub fn decide_permission(&mut self, decision: PermissionDecision) -> bool {
        let Some(current) = self.permissions.current() else {
            return false;
        };
        let decision = match decision {
            PermissionDecision::AllowAlways if current.hide_persistent_option => {
                tracing::debug!(id = current.id, "persistent allow hidden; ignoring key");
                return false;
            }
            other => other,
        };
        self.permissions.decide(decision)
    }

    /// Abort the running shell command, or else the agent call.
    pub fn abort_active(&mut self) {
        if self.executor.abort_command() {
            return;
        }
        if self.loading {
            tracing::info!("aborting agent call");
            self.runtime.abort();
            self.set_loading(false);
            self.permissions.drop_abandoned();
        }
    }

    /// Directory for subsequent shell commands.
    pub fn update_workdir(&mut self, path: &Path) {
        self.executor.update_workdir(path);
    }

    /// Reset the buffer without submitting.
    pub fn clear_input(&mut self) {
        self.overlay.dismiss();
        self.lookups.cancel();
        self.history.reset_navigation();
        self.buffer.clear();
        self.observer.overlay_changed(self.overlay.state());
    }

    /// Cancel outstanding work and persist history.
    pub fn shutdown(&mut self) {
        self.lookups.cancel();
        self.permissions.cancel_all();
        self.executor.abort_command();
        if let Some(path) = &self.options.history_path {
            if let Err(err) = self.history.save_file(path) {
                tracing::warn!(path = %path.display(), error = %err, "failed to save input history");
            }
        }
    }

    fn set_permission_mode(&mut self, mode: PermissionMode) {
        if self.mode.send_replace(mode) != mode {
            tracing::info!(%mode, "permission mode changed");
        }
        self.observer.permission_mode_changed(mode);
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.observer.loading_changed(loading);
        }
    }

    fn set_modal(&mut self, open: bool) {
        if self.modal != open {
            self.modal = open;
            self.observer.modal_changed(open);
        }
    }

    fn schedule_lookup_opt(&mut self, request: Option<LookupRequest>) {
        if let Some(request) = request {
            self.schedule_lookup(request);
        }
    }

    fn schedule_lookup(&mut self, request: LookupRequest) {
        let limit = self.options.max_candidates;
        let source: Arc<dyn CandidateSource> = match request.kind {
            OverlayKind::File => self.file_source.clone(),
            OverlayKind::Command => Arc::new(CommandSearch::new(self.command_catalog(), limit)),
            OverlayKind::History => {
                Arc::new(HistorySearch::new(self.history.entries().to_vec(), limit))
            }
        };
        self.lookups.schedule(request, source);
    }
}

fn route_name(outcome: &SubmitOutcome) -> &'static str {
    match outcome {
        SubmitOutcome::Empty => "empty",
        SubmitOutcome::Busy => "busy",
        SubmitOutcome::Shell(_) => "shell",
        SubmitOutcome::Memory(_) => "memory",
        SubmitOutcome::Builtin(_) => "builtin",
        SubmitOutcome::SlashCommand { .. } => "slash",
        SubmitOutcome::Message { .. } => "message",
    }
}
