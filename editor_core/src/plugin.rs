//! Plugin contract.
//!
//! A plugin is the only way to extend the editor. During [`Plugin::setup`] it
//! receives a [`PluginContext`] through which it can read the editor, register
//! commands and decorations, and subscribe to the event bus. Everything it
//! registers is tagged with its id and removed again when it is unregistered.

use crate::command::Command;
use crate::decoration::Decoration;
use crate::editor::Editor;
use crate::error::Result;
use crate::events::{EditorEvent, HandlerId};
use crate::format::FormatKind;
use crate::registry::Owner;
use crate::selection::Selection;
use std::panic::{self, AssertUnwindSafe};

/// Teardown returned from [`Plugin::setup`], run when the plugin is removed.
pub type Cleanup = Box<dyn FnOnce()>;

/// An extension unit.
///
/// Hooks run in plugin registration order. A hook that panics is logged and
/// treated as if it had returned its default.
pub trait Plugin {
    /// Unique plugin id.
    fn id(&self) -> &str;

    /// Human readable name.
    fn name(&self) -> &str {
        self.id()
    }

    /// Called once on registration.
    fn setup(&mut self, _ctx: &mut PluginContext<'_>) -> Result<Option<Cleanup>> {
        Ok(None)
    }

    /// Commands merged into the registry after `setup`.
    fn commands(&self) -> Vec<Command> {
        Vec::new()
    }

    /// Decorations merged into the registry after `setup`.
    fn decorations(&self) -> Vec<Decoration> {
        Vec::new()
    }

    /// May replace the content about to be committed.
    fn before_content_change(&self, _content: &str) -> Option<String> {
        None
    }

    fn after_content_change(&self, _content: &str) {}

    /// Returning `Some(false)` cancels the format operation.
    fn before_format(&self, _kind: FormatKind, _selection: &Selection) -> Option<bool> {
        None
    }

    fn after_format(&self, _kind: FormatKind, _selection: &Selection) {}
}

/// The editor handle given to a plugin during setup.
pub struct PluginContext<'a> {
    plugin_id: String,
    editor: &'a mut Editor,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(plugin_id: impl Into<String>, editor: &'a mut Editor) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            editor,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Read access to the live editor.
    pub fn editor(&self) -> &Editor {
        self.editor
    }

    /// Registers a command owned by this plugin.
    pub fn register_command(&mut self, command: Command) -> Result<()> {
        let owner = Owner::plugin(&self.plugin_id);
        self.editor.commands_mut().register(owner, command)
    }

    /// Registers a decoration owned by this plugin.
    pub fn register_decoration(&mut self, decoration: Decoration) -> Result<()> {
        let owner = Owner::plugin(&self.plugin_id);
        self.editor.decorations_mut().register(owner, decoration)
    }

    /// Subscribes to editor events for as long as this plugin is registered.
    pub fn subscribe(&mut self, handler: impl Fn(&EditorEvent) + 'static) -> HandlerId {
        let owner = Owner::plugin(&self.plugin_id);
        self.editor.events_mut().subscribe(owner, handler)
    }
}

/// Runs plugin-supplied code, containing any panic.
pub(crate) fn guard<R>(owner: &str, what: &str, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("{} panicked in {}: {}", owner, what, message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_passes_values_through() {
        assert_eq!(guard("p", "hook", || 42), Some(42));
    }

    #[test]
    fn test_guard_contains_panics() {
        let result: Option<()> = guard("p", "hook", || panic!("broken plugin"));
        assert!(result.is_none());
    }
}
