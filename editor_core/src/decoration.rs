//! Rendering annotations attached to text ranges.

use crate::buffer::TextBuffer;
use crate::error::{EditorError, Result};
use crate::registry::{Owner, Registry};
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a decoration renders within a line or around whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecorationKind {
    Inline,
    Block,
}

/// A span of text with rendering metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub id: String,
    pub kind: DecorationKind,
    pub range: Selection,
    pub attributes: BTreeMap<String, String>,
    pub class_name: Option<String>,
}

impl Decoration {
    pub fn new(id: impl Into<String>, kind: DecorationKind, range: Selection) -> Self {
        Self {
            id: id.into(),
            kind,
            range,
            attributes: BTreeMap::new(),
            class_name: None,
        }
    }

    pub fn inline(id: impl Into<String>, range: Selection) -> Self {
        Self::new(id, DecorationKind::Inline, range)
    }

    pub fn block(id: impl Into<String>, range: Selection) -> Self {
        Self::new(id, DecorationKind::Block, range)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

/// All decorations known to an editor.
#[derive(Debug, Default)]
pub struct DecorationRegistry {
    inner: Registry<Decoration>,
}

impl DecorationRegistry {
    /// Adds a decoration. Fails if another decoration already uses its id.
    pub fn register(&mut self, owner: Owner, decoration: Decoration) -> Result<()> {
        let id = decoration.id.clone();
        if !self.inner.insert(id.clone(), owner, decoration) {
            return Err(EditorError::DuplicateDecoration(id));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Decoration> {
        self.inner.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains(id)
    }

    pub fn owner_of(&self, id: &str) -> Option<&Owner> {
        self.inner.owner(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Decoration> {
        self.inner.remove(id)
    }

    pub(crate) fn remove_owned_by(&mut self, plugin_id: &str) -> usize {
        self.inner.remove_owned_by(plugin_id)
    }

    /// Returns every decoration in document order.
    pub fn sorted(&self) -> Vec<&Decoration> {
        let mut decorations: Vec<&Decoration> = self.inner.values().collect();
        decorations.sort_by(|a, b| {
            (a.range.start, a.range.end, &a.id).cmp(&(b.range.start, b.range.end, &b.id))
        });
        decorations
    }

    /// Returns decorations whose range still matches `buffer`, in document
    /// order. Stale ranges are skipped rather than shifted.
    pub fn visible(&self, buffer: &TextBuffer) -> Vec<&Decoration> {
        self.sorted()
            .into_iter()
            .filter(|decoration| decoration.range.matches(buffer))
            .collect()
    }

    /// Returns decorations overlapping `range`, in document order.
    pub fn overlapping(&self, range: &Selection) -> Vec<&Decoration> {
        self.sorted()
            .into_iter()
            .filter(|decoration| decoration.range.overlaps(range))
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
