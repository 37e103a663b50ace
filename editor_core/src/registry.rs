//! Id-keyed storage shared by the command and decoration registries.

use std::collections::HashMap;
use std::fmt;

/// Who registered an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Registered by the editor itself or by the host.
    Core,
    /// Registered by the plugin with this id.
    Plugin(String),
}

impl Owner {
    pub fn plugin(id: impl Into<String>) -> Self {
        Owner::Plugin(id.into())
    }

    /// Returns true if this entry belongs to the plugin `id`.
    pub fn is_plugin(&self, id: &str) -> bool {
        matches!(self, Owner::Plugin(owner) if owner == id)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Core => f.write_str("core"),
            Owner::Plugin(id) => write!(f, "plugin '{id}'"),
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    owner: Owner,
    item: T,
}

/// A map from unique string ids to items, remembering each item's owner.
#[derive(Debug)]
pub(crate) struct Registry<T> {
    entries: HashMap<String, Entry<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    /// Inserts `item` under `id`. Returns false and leaves the registry
    /// untouched if the id is taken.
    pub(crate) fn insert(&mut self, id: String, owner: Owner, item: T) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, Entry { owner, item });
        true
    }

    pub(crate) fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id).map(|entry| &entry.item)
    }

    pub(crate) fn owner(&self, id: &str) -> Option<&Owner> {
        self.entries.get(id).map(|entry| &entry.owner)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<T> {
        self.entries.remove(id).map(|entry| entry.item)
    }

    /// Removes every entry registered by the plugin `plugin_id`.
    /// Returns how many were removed.
    pub(crate) fn remove_owned_by(&mut self, plugin_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.owner.is_plugin(plugin_id));
        before - self.entries.len()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values().map(|entry| &entry.item)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut registry = Registry::default();
        assert!(registry.insert("a".into(), Owner::Core, 1));
        assert!(!registry.insert("a".into(), Owner::plugin("p"), 2));
        assert_eq!(registry.get("a"), Some(&1));
        assert_eq!(registry.owner("a"), Some(&Owner::Core));
    }

    #[test]
    fn test_remove_owned_by() {
        let mut registry = Registry::default();
        registry.insert("a".into(), Owner::plugin("p"), 1);
        registry.insert("b".into(), Owner::plugin("p"), 2);
        registry.insert("c".into(), Owner::plugin("q"), 3);
        registry.insert("d".into(), Owner::Core, 4);

        assert_eq!(registry.remove_owned_by("p"), 2);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("c"));
        assert!(registry.contains("d"));
    }
}
