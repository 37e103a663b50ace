//! Derived document statistics.

use crate::buffer::TextBuffer;
use serde::{Deserialize, Serialize};

/// Average silent reading speed used for the reading time estimate.
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Counts recomputed after every content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub word_count: usize,
    pub char_count: usize,
    pub lines_count: usize,
    /// Estimated reading time in whole minutes, rounded up.
    pub reading_time: usize,
}

impl Default for Stats {
    fn default() -> Self {
        Self::compute(&TextBuffer::new(), DEFAULT_WORDS_PER_MINUTE)
    }
}

impl Stats {
    /// Computes stats for `buffer`.
    pub fn compute(buffer: &TextBuffer, words_per_minute: usize) -> Self {
        let word_count = buffer.word_count();
        Self {
            word_count,
            char_count: buffer.len_chars(),
            lines_count: buffer.len_lines(),
            reading_time: word_count.div_ceil(words_per_minute.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sentence() {
        let stats = Stats::compute(&TextBuffer::from_text("one two three"), 200);
        assert_eq!(stats.word_count, 3);
        assert_eq!(stats.char_count, 13);
        assert_eq!(stats.lines_count, 1);
        assert_eq!(stats.reading_time, 1);
    }

    #[test]
    fn test_empty() {
        let stats = Stats::default();
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.char_count, 0);
        assert_eq!(stats.lines_count, 1);
        assert_eq!(stats.reading_time, 0);
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let text = vec!["word"; 201].join(" ");
        let stats = Stats::compute(&TextBuffer::from_text(&text), 200);
        assert_eq!(stats.word_count, 201);
        assert_eq!(stats.reading_time, 2);
    }

    #[test]
    fn test_lines() {
        let stats = Stats::compute(&TextBuffer::from_text("a\nb\nc\n"), 200);
        assert_eq!(stats.lines_count, 4);
    }
}
