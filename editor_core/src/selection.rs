//! Selection value type.

use crate::buffer::TextBuffer;
use serde::{Deserialize, Serialize};

/// A contiguous span of note text.
///
/// `start` and `end` are character offsets with `start <= end`. `text` is the
/// substring captured when the selection was made. After the content changes
/// the selection may no longer match; such a selection is stale and must be
/// discarded rather than shifted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Start character offset (inclusive).
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// The selected text at capture time.
    pub text: String,
}

impl Selection {
    /// Creates a selection from raw parts without checking them.
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Captures the range `start..end` of `buffer`.
    /// Reversed ranges are normalized; returns `None` if the range runs past
    /// the end of the buffer.
    pub fn capture(buffer: &TextBuffer, start: usize, end: usize) -> Option<Self> {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        buffer.slice(start, end).map(|text| Self { start, end, text })
    }

    /// Returns the number of selected characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the selection covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if the selection still describes `buffer`.
    pub fn matches(&self, buffer: &TextBuffer) -> bool {
        self.start <= self.end
            && buffer
                .slice(self.start, self.end)
                .is_some_and(|text| text == self.text)
    }

    /// Returns true if the two selections share at least one character.
    pub fn overlaps(&self, other: &Selection) -> bool {
        self.start < other.end && other.start < self.end
    }
}
