//! Named, executable editor actions.

use crate::editor::Editor;
use crate::error::{CommandError, EditorError, Result};
use crate::registry::{Owner, Registry};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

type ExecuteFn = dyn Fn(&mut Editor, Option<&Value>) -> Result<(), CommandError>;
type EnabledFn = dyn Fn(&Editor) -> bool;

/// An action that can be bound to shortcuts, toolbars and the palette.
#[derive(Clone)]
pub struct Command {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Shortcut in [`KeyChord`](crate::KeyChord) syntax, e.g. `"Mod+Shift+Z"`.
    pub shortcut: Option<String>,
    pub category: Option<String>,
    is_enabled: Option<Rc<EnabledFn>>,
    execute: Rc<ExecuteFn>,
}

impl Command {
    /// Creates a command that is always enabled.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        execute: impl Fn(&mut Editor, Option<&Value>) -> Result<(), CommandError> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            shortcut: None,
            category: None,
            is_enabled: None,
            execute: Rc::new(execute),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Adds an enablement predicate evaluated before every execution.
    pub fn with_enabled(mut self, is_enabled: impl Fn(&Editor) -> bool + 'static) -> Self {
        self.is_enabled = Some(Rc::new(is_enabled));
        self
    }

    /// Returns whether the command may run against `editor`.
    pub fn is_enabled(&self, editor: &Editor) -> bool {
        self.is_enabled.as_ref().map_or(true, |pred| pred(editor))
    }

    pub(crate) fn run(&self, editor: &mut Editor, args: Option<&Value>) -> Result<(), CommandError> {
        (self.execute)(editor, args)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shortcut", &self.shortcut)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// All commands known to an editor.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    inner: Registry<Command>,
}

impl CommandRegistry {
    /// Adds a command. Fails if another command already uses its id.
    pub fn register(&mut self, owner: Owner, command: Command) -> Result<()> {
        let id = command.id.clone();
        if !self.inner.insert(id.clone(), owner, command) {
            return Err(EditorError::DuplicateCommand(id));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Command> {
        self.inner.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains(id)
    }

    pub fn owner_of(&self, id: &str) -> Option<&Owner> {
        self.inner.owner(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Command> {
        self.inner.remove(id)
    }

    pub(crate) fn remove_owned_by(&mut self, plugin_id: &str) -> usize {
        self.inner.remove_owned_by(plugin_id)
    }

    /// Returns every command sorted by category, then name.
    pub fn sorted(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.inner.values().collect();
        commands.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        commands
    }

    /// Returns commands whose name or id contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<&Command> {
        let query = query.to_lowercase();
        self.sorted()
            .into_iter()
            .filter(|cmd| {
                cmd.name.to_lowercase().contains(&query) || cmd.id.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    pub(crate) fn clear(&mut self) {
        self.inner.clear();
    }
}
