//! Editor event bus.
//!
//! Plugins and hosts subscribe to [`EditorEvent`]s here. Handlers only see the
//! event, never the editor, so they cannot re-enter a mutation in progress.

use crate::editor::SaveStatus;
use crate::format::FormatKind;
use crate::plugin::guard;
use crate::registry::Owner;
use crate::selection::Selection;

/// Why the content changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A note was loaded; nothing new to persist.
    Load,
    /// `set_content` from the host or a command.
    Edit,
    /// Markup was applied by the format engine.
    Format(FormatKind),
    Undo,
    Redo,
}

impl ChangeOrigin {
    /// Returns true if the change produced content that is not yet persisted.
    pub fn is_user_change(self) -> bool {
        !matches!(self, ChangeOrigin::Load)
    }
}

/// Something that happened inside the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ContentChanged { content: String, origin: ChangeOrigin },
    SelectionChanged(Option<Selection>),
    Formatted { kind: FormatKind, selection: Selection },
    CommandExecuted(String),
    SaveStatusChanged(SaveStatus),
    PluginRegistered(String),
    PluginUnregistered(String),
}

/// Identifies one event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Handler {
    id: HandlerId,
    owner: Owner,
    callback: Box<dyn Fn(&EditorEvent)>,
}

/// Fans events out to handlers in subscription order.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Handler>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler and returns its id.
    pub fn subscribe(&mut self, owner: Owner, callback: impl Fn(&EditorEvent) + 'static) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push(Handler {
            id,
            owner,
            callback: Box::new(callback),
        });
        id
    }

    /// Removes a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|handler| handler.id != id);
        before != self.handlers.len()
    }

    /// Removes every handler owned by the plugin `plugin_id`.
    pub fn remove_owned_by(&mut self, plugin_id: &str) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|handler| !handler.owner.is_plugin(plugin_id));
        before - self.handlers.len()
    }

    /// Delivers `event` to every handler. A panicking handler is logged and
    /// skipped.
    pub fn emit(&self, event: &EditorEvent) {
        for handler in &self.handlers {
            let owner = handler.owner.to_string();
            guard(&owner, "event handler", || (handler.callback)(event));
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second"] {
            let seen = seen.clone();
            bus.subscribe(Owner::Core, move |_| seen.borrow_mut().push(tag));
        }
        bus.emit(&EditorEvent::CommandExecuted("x".into()));
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let hits = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        bus.subscribe(Owner::plugin("bad"), |_| panic!("boom"));
        let counter = hits.clone();
        bus.subscribe(Owner::Core, move |_| *counter.borrow_mut() += 1);

        bus.emit(&EditorEvent::PluginRegistered("bad".into()));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe_and_remove_owned() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(Owner::Core, |_| {});
        bus.subscribe(Owner::plugin("p"), |_| {});
        bus.subscribe(Owner::plugin("p"), |_| {});

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.remove_owned_by("p"), 2);
        assert!(bus.is_empty());
    }
}
