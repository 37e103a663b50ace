//! Main editor logic.
//!
//! [`Editor`] owns all state of one open note. Every field is private; hosts
//! read through accessors and change state only through the methods below,
//! each of which notifies subscribers once the transition is complete.

use crate::buffer::TextBuffer;
use crate::command::{Command, CommandRegistry};
use crate::config::EditorConfig;
use crate::decoration::{Decoration, DecorationRegistry};
use crate::error::{EditorError, Result};
use crate::events::{ChangeOrigin, EditorEvent, EventBus, HandlerId};
use crate::format::{self, FormatKind};
use crate::history::History;
use crate::keymap::{KeyChord, Keymap};
use crate::plugin::{guard, Cleanup, Plugin, PluginContext};
use crate::registry::Owner;
use crate::selection::Selection;
use crate::stats::Stats;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persistence state of the note as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Unsaved,
    Error,
}

/// Floating formatting toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Toolbar {
    pub visible: bool,
    pub x: f32,
    pub y: f32,
}

/// Overlay panels the host may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Panels {
    pub search_open: bool,
    pub palette_open: bool,
}

/// Token returned by [`Editor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Subscriber {
    id: Subscription,
    callback: Box<dyn Fn(&Editor)>,
}

struct PluginEntry {
    id: String,
    plugin: Box<dyn Plugin>,
    cleanup: Option<Cleanup>,
}

/// The editor store.
pub struct Editor {
    /// The note text.
    buffer: TextBuffer,
    /// Current selection, if any.
    selection: Option<Selection>,
    /// Undo/redo history.
    history: History,
    stats: Stats,
    save_status: SaveStatus,
    toolbar: Toolbar,
    panels: Panels,
    /// Plugins in registration order.
    plugins: Vec<PluginEntry>,
    commands: CommandRegistry,
    decorations: DecorationRegistry,
    events: EventBus,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
    config: EditorConfig,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Creates a new empty editor.
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    /// Creates a new empty editor with custom settings.
    pub fn with_config(config: EditorConfig) -> Self {
        let buffer = TextBuffer::new();
        let mut history = History::new(config.history);
        history.seed("", None);
        Self {
            stats: Stats::compute(&buffer, config.words_per_minute),
            buffer,
            selection: None,
            history,
            save_status: SaveStatus::Saved,
            toolbar: Toolbar::default(),
            panels: Panels::default(),
            plugins: Vec::new(),
            commands: CommandRegistry::default(),
            decorations: DecorationRegistry::default(),
            events: EventBus::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
            config,
        }
    }

    /// Creates an editor holding a previously saved note.
    pub fn with_content(content: &str) -> Self {
        let mut editor = Self::new();
        editor.load(content);
        editor
    }

    // ==================== Reading State ====================

    /// Returns the note text.
    pub fn content(&self) -> String {
        self.buffer.text()
    }

    /// Returns a reference to the buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    /// Returns whether the note has changes that are not persisted.
    pub fn is_modified(&self) -> bool {
        self.save_status != SaveStatus::Saved
    }

    pub fn toolbar(&self) -> Toolbar {
        self.toolbar
    }

    pub fn panels(&self) -> Panels {
        self.panels
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn decorations(&self) -> &DecorationRegistry {
        &self.decorations
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Returns registered plugin ids in registration order.
    pub fn plugin_ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|entry| entry.id.as_str())
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.iter().any(|entry| entry.id == id)
    }

    pub(crate) fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    pub(crate) fn decorations_mut(&mut self) -> &mut DecorationRegistry {
        &mut self.decorations
    }

    pub(crate) fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // ==================== Content ====================

    /// Replaces the note without recording history, e.g. after opening it.
    /// Content hooks do not run and the note counts as saved.
    pub fn load(&mut self, content: &str) {
        self.buffer = TextBuffer::from_text(content);
        self.selection = None;
        self.history.seed(content, None);
        self.stats = Stats::compute(&self.buffer, self.config.words_per_minute);
        self.update_save_status(SaveStatus::Saved);
        self.events.emit(&EditorEvent::ContentChanged {
            content: content.to_string(),
            origin: ChangeOrigin::Load,
        });
        self.notify();
    }

    /// Replaces the note text.
    ///
    /// `before_content_change` hooks may rewrite the text first. Returns
    /// false if the resulting text equals the current one.
    pub fn set_content(&mut self, content: impl Into<String>) -> bool {
        let selection = self.selection.clone();
        self.commit(content.into(), selection, ChangeOrigin::Edit)
    }

    fn commit(&mut self, content: String, selection: Option<Selection>, origin: ChangeOrigin) -> bool {
        let content = self.run_before_content_change(content);
        if self.buffer.eq_text(&content) {
            return false;
        }

        self.buffer = TextBuffer::from_text(&content);
        self.stats = Stats::compute(&self.buffer, self.config.words_per_minute);
        self.selection = selection.filter(|sel| sel.matches(&self.buffer));
        self.history.record(content.as_str(), self.selection.clone());
        self.update_save_status(SaveStatus::Unsaved);
        log::debug!("Content committed ({:?}, {} chars)", origin, self.stats.char_count);

        self.run_after_content_change(&content);
        self.events.emit(&EditorEvent::ContentChanged { content, origin });
        self.notify();
        true
    }

    // ==================== Selection ====================

    /// Sets or clears the selection. A selection that does not describe the
    /// current content is rejected.
    pub fn set_selection(&mut self, selection: Option<Selection>) -> Result<()> {
        if let Some(sel) = &selection {
            self.check_selection(sel)?;
        }
        self.selection = selection;
        self.events
            .emit(&EditorEvent::SelectionChanged(self.selection.clone()));
        self.notify();
        Ok(())
    }

    /// Selects `start..end` (character offsets) and returns the selection.
    pub fn select(&mut self, start: usize, end: usize) -> Result<Selection> {
        let selection =
            Selection::capture(&self.buffer, start, end).ok_or(EditorError::InvalidSelection {
                start,
                end,
                len: self.buffer.len_chars(),
            })?;
        self.set_selection(Some(selection.clone()))?;
        Ok(selection)
    }

    /// Selects the whole note.
    pub fn select_all(&mut self) -> Result<Selection> {
        self.select(0, self.buffer.len_chars())
    }

    fn check_selection(&self, selection: &Selection) -> Result<()> {
        if selection.matches(&self.buffer) {
            Ok(())
        } else {
            Err(EditorError::InvalidSelection {
                start: selection.start,
                end: selection.end,
                len: self.buffer.len_chars(),
            })
        }
    }

    // ==================== History ====================

    /// Steps back one history entry. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };
        let (content, selection) = (entry.content.clone(), entry.selection.clone());
        self.restore(content, selection, ChangeOrigin::Undo);
        true
    }

    /// Re-applies the last undone entry. Returns false if there is nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };
        let (content, selection) = (entry.content.clone(), entry.selection.clone());
        self.restore(content, selection, ChangeOrigin::Redo);
        true
    }

    fn restore(&mut self, content: String, selection: Option<Selection>, origin: ChangeOrigin) {
        self.buffer = TextBuffer::from_text(&content);
        self.stats = Stats::compute(&self.buffer, self.config.words_per_minute);
        self.selection = selection.filter(|sel| sel.matches(&self.buffer));
        self.update_save_status(SaveStatus::Unsaved);
        log::debug!("{:?} restored {} chars", origin, self.stats.char_count);
        self.events.emit(&EditorEvent::ContentChanged { content, origin });
        self.notify();
    }

    // ==================== Formatting ====================

    /// Wraps `selection` with the markup for `kind`.
    ///
    /// Returns `Ok(false)` if a `before_format` hook vetoed the operation.
    /// Afterwards the selection covers the original text inside the markers.
    pub fn format(&mut self, kind: FormatKind, selection: &Selection) -> Result<bool> {
        self.check_selection(selection)?;
        if !self.run_before_format(kind, selection) {
            log::debug!("Format {} cancelled by plugin", kind);
            return Ok(false);
        }

        let (content, wrapped) = format::wrap(&self.buffer, kind, selection);
        if !self.commit(content, Some(wrapped.clone()), ChangeOrigin::Format(kind)) {
            log::debug!("Format {} left the content unchanged", kind);
            return Ok(false);
        }
        self.run_after_format(kind, selection);
        self.events.emit(&EditorEvent::Formatted {
            kind,
            selection: wrapped,
        });
        Ok(true)
    }

    /// Formats the current selection. Without a selection this does nothing
    /// and returns `Ok(false)`.
    pub fn format_active(&mut self, kind: FormatKind) -> Result<bool> {
        match self.selection.clone() {
            Some(selection) => self.format(kind, &selection),
            None => Ok(false),
        }
    }

    // ==================== Plugins ====================

    /// Registers a plugin.
    pub fn register_plugin(&mut self, plugin: impl Plugin + 'static) -> Result<()> {
        self.register_boxed_plugin(Box::new(plugin))
    }

    /// Registers a boxed plugin.
    ///
    /// Runs `setup`, then merges the plugin's declared commands and
    /// decorations. If any step fails, everything the plugin registered is
    /// removed again, its cleanup runs and the error is returned.
    pub fn register_boxed_plugin(&mut self, mut plugin: Box<dyn Plugin>) -> Result<()> {
        let id = plugin.id().to_string();
        if self.has_plugin(&id) {
            return Err(EditorError::DuplicatePlugin(id));
        }

        let setup = {
            let mut ctx = PluginContext::new(&id, self);
            guard(&id, "setup", || plugin.setup(&mut ctx))
        };
        let cleanup = match setup {
            Some(Ok(cleanup)) => cleanup,
            Some(Err(e)) => {
                self.purge_plugin(&id, None);
                return Err(e);
            }
            None => {
                self.purge_plugin(&id, None);
                return Err(EditorError::PluginSetup(id));
            }
        };

        let owner = Owner::plugin(&id);
        let declared = guard(&id, "declarations", || {
            (plugin.commands(), plugin.decorations())
        });
        let Some((commands, decorations)) = declared else {
            self.purge_plugin(&id, cleanup);
            return Err(EditorError::PluginSetup(id));
        };
        let merged = commands
            .into_iter()
            .try_for_each(|cmd| self.commands.register(owner.clone(), cmd))
            .and_then(|()| {
                decorations
                    .into_iter()
                    .try_for_each(|dec| self.decorations.register(owner.clone(), dec))
            });
        if let Err(e) = merged {
            log::warn!("Plugin {} rejected: {}", id, e);
            self.purge_plugin(&id, cleanup);
            return Err(e);
        }

        log::info!("Registered plugin {} ({})", id, plugin.name());
        self.plugins.push(PluginEntry {
            id: id.clone(),
            plugin,
            cleanup,
        });
        self.events.emit(&EditorEvent::PluginRegistered(id));
        self.notify();
        Ok(())
    }

    /// Removes a plugin, running its cleanup and dropping everything it
    /// registered. Returns false if no such plugin exists.
    pub fn unregister_plugin(&mut self, id: &str) -> bool {
        let Some(index) = self.plugins.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = self.plugins.remove(index);
        self.purge_plugin(&entry.id, entry.cleanup);
        log::info!("Unregistered plugin {}", id);
        self.events
            .emit(&EditorEvent::PluginUnregistered(id.to_string()));
        self.notify();
        true
    }

    fn purge_plugin(&mut self, id: &str, cleanup: Option<Cleanup>) {
        if let Some(cleanup) = cleanup {
            guard(id, "cleanup", cleanup);
        }
        let commands = self.commands.remove_owned_by(id);
        let decorations = self.decorations.remove_owned_by(id);
        let handlers = self.events.remove_owned_by(id);
        log::debug!(
            "Purged plugin {}: {} commands, {} decorations, {} handlers",
            id,
            commands,
            decorations,
            handlers
        );
    }

    fn run_before_content_change(&self, content: String) -> String {
        self.plugins.iter().fold(content, |acc, entry| {
            match guard(&entry.id, "before_content_change", || {
                entry.plugin.before_content_change(&acc)
            }) {
                Some(Some(replaced)) => replaced,
                _ => acc,
            }
        })
    }

    fn run_after_content_change(&self, content: &str) {
        for entry in &self.plugins {
            guard(&entry.id, "after_content_change", || {
                entry.plugin.after_content_change(content)
            });
        }
    }

    fn run_before_format(&self, kind: FormatKind, selection: &Selection) -> bool {
        self.plugins.iter().all(|entry| {
            guard(&entry.id, "before_format", || {
                entry.plugin.before_format(kind, selection)
            }) != Some(Some(false))
        })
    }

    fn run_after_format(&self, kind: FormatKind, selection: &Selection) {
        for entry in &self.plugins {
            guard(&entry.id, "after_format", || {
                entry.plugin.after_format(kind, selection)
            });
        }
    }

    // ==================== Commands & Decorations ====================

    /// Registers a command owned by the host.
    pub fn register_command(&mut self, command: Command) -> Result<()> {
        self.commands.register(Owner::Core, command)?;
        self.notify();
        Ok(())
    }

    /// Runs a command.
    ///
    /// Returns `Ok(false)` without running it if the command is disabled.
    pub fn execute_command(&mut self, id: &str, args: Option<&Value>) -> Result<bool> {
        let command = self
            .commands
            .get(id)
            .cloned()
            .ok_or_else(|| EditorError::CommandNotFound(id.to_string()))?;
        if !command.is_enabled(self) {
            log::debug!("Command {} is disabled", id);
            return Ok(false);
        }

        match guard(id, "command", || command.run(self, args)) {
            Some(Ok(())) => {
                self.events
                    .emit(&EditorEvent::CommandExecuted(id.to_string()));
                Ok(true)
            }
            Some(Err(source)) => Err(EditorError::CommandFailed {
                id: id.to_string(),
                source,
            }),
            None => Err(EditorError::CommandPanicked(id.to_string())),
        }
    }

    /// Runs the command bound to `chord`. Returns `Ok(false)` if the chord is
    /// unbound or the command is disabled.
    pub fn handle_key(&mut self, chord: &KeyChord) -> Result<bool> {
        let keymap = Keymap::from_commands(&self.commands);
        match keymap.resolve(chord) {
            Some(id) => {
                let id = id.to_string();
                self.execute_command(&id, None)
            }
            None => Ok(false),
        }
    }

    /// Adds a decoration owned by the host.
    pub fn add_decoration(&mut self, decoration: Decoration) -> Result<()> {
        self.decorations.register(Owner::Core, decoration)?;
        self.notify();
        Ok(())
    }

    /// Removes a decoration by id.
    pub fn remove_decoration(&mut self, id: &str) -> Option<Decoration> {
        let removed = self.decorations.remove(id);
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    // ==================== UI State ====================

    /// Updates the persistence state shown to the user.
    pub fn set_save_status(&mut self, status: SaveStatus) {
        if self.update_save_status(status) {
            self.notify();
        }
    }

    fn update_save_status(&mut self, status: SaveStatus) -> bool {
        if self.save_status == status {
            return false;
        }
        self.save_status = status;
        self.events.emit(&EditorEvent::SaveStatusChanged(status));
        true
    }

    /// Shows the formatting toolbar at the given position.
    pub fn show_toolbar(&mut self, x: f32, y: f32) {
        self.toolbar = Toolbar { visible: true, x, y };
        self.notify();
    }

    pub fn hide_toolbar(&mut self) {
        self.toolbar.visible = false;
        self.notify();
    }

    pub fn toggle_search(&mut self) {
        self.panels.search_open = !self.panels.search_open;
        self.notify();
    }

    pub fn toggle_command_palette(&mut self) {
        self.panels.palette_open = !self.panels.palette_open;
        self.notify();
    }

    // ==================== Subscriptions ====================

    /// Registers a state observer. It is called immediately with the current
    /// state and again after every state transition.
    pub fn subscribe(&mut self, callback: impl Fn(&Editor) + 'static) -> Subscription {
        let id = Subscription(self.next_subscription);
        self.next_subscription += 1;
        guard("subscriber", "initial notify", || callback(self));
        self.subscribers.push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        id
    }

    /// Removes a state observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != subscription);
        before != self.subscribers.len()
    }

    /// Subscribes the host to the event bus.
    pub fn on_event(&mut self, handler: impl Fn(&EditorEvent) + 'static) -> HandlerId {
        self.events.subscribe(Owner::Core, handler)
    }

    pub fn off_event(&mut self, id: HandlerId) -> bool {
        self.events.unsubscribe(id)
    }

    fn notify(&self) {
        for sub in &self.subscribers {
            guard("subscriber", "notify", || (sub.callback)(self));
        }
    }

    // ==================== Lifecycle ====================

    /// Tears down every plugin and returns the editor to its initial state.
    /// Subscribers stay attached and are notified.
    pub fn reset(&mut self) {
        self.teardown_plugins();
        self.commands.clear();
        self.decorations.clear();
        self.events.clear();
        self.buffer = TextBuffer::new();
        self.selection = None;
        self.history.seed("", None);
        self.stats = Stats::compute(&self.buffer, self.config.words_per_minute);
        self.save_status = SaveStatus::Saved;
        self.toolbar = Toolbar::default();
        self.panels = Panels::default();
        self.notify();
    }

    /// Runs plugin cleanups, most recently registered first.
    fn teardown_plugins(&mut self) {
        while let Some(entry) = self.plugins.pop() {
            self.purge_plugin(&entry.id, entry.cleanup);
        }
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.teardown_plugins();
    }
}
