//! Note text storage backed by ropey.

use ropey::Rope;
use std::fmt;

/// The text of a note, stored as a rope.
///
/// All offsets are character indices, which is also the unit used by
/// [`Selection`](crate::Selection).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    /// Creates a new empty text buffer.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Creates a text buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Returns the total number of characters in the buffer.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the total number of lines in the buffer.
    /// An empty buffer has one line.
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Returns the text between two character offsets, or `None` if the
    /// range is reversed or runs past the end of the buffer.
    pub fn slice(&self, start: usize, end: usize) -> Option<String> {
        if start > end || end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(start..end).to_string())
    }

    /// Inserts a string at the given character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) {
        let idx = char_idx.min(self.len_chars());
        self.rope.insert(idx, text);
    }

    /// Removes text in the given character range.
    pub fn remove(&mut self, start: usize, end: usize) {
        let start = start.min(self.len_chars());
        let end = end.min(self.len_chars());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Counts whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.rope
            .chunks()
            .fold((0, false), |(count, in_word), chunk| {
                chunk.chars().fold((count, in_word), |(count, in_word), ch| {
                    if ch.is_whitespace() {
                        (count, false)
                    } else if in_word {
                        (count, true)
                    } else {
                        (count + 1, true)
                    }
                })
            })
            .0
    }

    /// Returns the entire buffer as a string.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Returns true if the buffer holds exactly `text`.
    pub fn eq_text(&self, text: &str) -> bool {
        self.rope == text
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buf = TextBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len_chars(), 0);
        assert_eq!(buf.len_lines(), 1);
    }

    #[test]
    fn test_from_text() {
        let buf = TextBuffer::from_text("hello\nworld");
        assert_eq!(buf.len_chars(), 11);
        assert_eq!(buf.len_lines(), 2);
        assert!(buf.eq_text("hello\nworld"));
    }

    #[test]
    fn test_slice_bounds() {
        let buf = TextBuffer::from_text("hello world");
        assert_eq!(buf.slice(0, 5), Some("hello".to_string()));
        assert_eq!(buf.slice(6, 11), Some("world".to_string()));
        assert_eq!(buf.slice(3, 3), Some(String::new()));
        assert_eq!(buf.slice(5, 3), None);
        assert_eq!(buf.slice(0, 12), None);
    }

    #[test]
    fn test_slice_uses_char_offsets() {
        let buf = TextBuffer::from_text("héllo wörld");
        assert_eq!(buf.len_chars(), 11);
        assert_eq!(buf.slice(6, 11), Some("wörld".to_string()));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut buf = TextBuffer::from_text("hello world");
        buf.insert(5, ",");
        assert_eq!(buf.text(), "hello, world");
        buf.remove(5, 6);
        assert_eq!(buf.text(), "hello world");
        buf.remove(5, 100);
        assert_eq!(buf.text(), "hello");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(TextBuffer::new().word_count(), 0);
        assert_eq!(TextBuffer::from_text("one two three").word_count(), 3);
        assert_eq!(TextBuffer::from_text("  spaced\n\tout  words ").word_count(), 3);
    }

    #[test]
    fn test_display_matches_text() {
        let buf = TextBuffer::from_text("line1\nline2");
        assert_eq!(buf.to_string(), buf.text());
    }
}
