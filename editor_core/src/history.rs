//! Undo/Redo history system.
//!
//! The history keeps whole-content snapshots. The top of the undo stack is
//! always the current state, so stepping back needs at least two entries.

use crate::selection::Selection;
use std::time::{Duration, Instant};

/// Default time window for coalescing edits (in milliseconds).
const MERGE_WINDOW_MS: u64 = 1000;

/// Edits whose length differs from the stack top by less than this many
/// characters may be coalesced.
const MERGE_THRESHOLD_CHARS: usize = 10;

/// Default maximum number of undo entries.
const MAX_ENTRIES: usize = 100;

/// A snapshot of the note at one point in its history.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub content: String,
    pub selection: Option<Selection>,
    pub timestamp: Instant,
}

/// Tuning knobs for [`History`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Edits closer together than this may be coalesced.
    pub merge_window: Duration,
    /// Maximum length delta (in characters) for coalescing.
    pub merge_threshold: usize,
    /// Maximum number of undo entries kept.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            merge_window: Duration::from_millis(MERGE_WINDOW_MS),
            merge_threshold: MERGE_THRESHOLD_CHARS,
            max_entries: MAX_ENTRIES,
        }
    }
}

/// What [`History::record_at`] did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The snapshot replaced the stack top.
    Merged,
    /// The snapshot was pushed as a new undo step.
    Appended,
}

/// Manages undo/redo history.
#[derive(Debug)]
pub struct History {
    /// Snapshots that can be returned to; the last one is the current state.
    undo_stack: Vec<UndoEntry>,
    /// Snapshots that were undone.
    redo_stack: Vec<UndoEntry>,
    config: HistoryConfig,
    /// When the previous edit was recorded. Cleared by undo/redo so the next
    /// edit always starts a new step.
    last_record: Option<Instant>,
    /// Whether coalescing is enabled.
    coalesce_enabled: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl History {
    /// Creates an empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            config: HistoryConfig {
                max_entries: config.max_entries.max(1),
                ..config
            },
            last_record: None,
            coalesce_enabled: true,
        }
    }

    /// Sets the coalesce window duration.
    pub fn set_merge_window(&mut self, window: Duration) {
        self.config.merge_window = window;
    }

    /// Enables or disables coalescing.
    pub fn set_coalesce_enabled(&mut self, enabled: bool) {
        self.coalesce_enabled = enabled;
    }

    /// Clears all history and seeds it with the initial state of the note.
    /// The seed entry is never coalesced with later edits.
    pub fn seed(&mut self, content: impl Into<String>, selection: Option<Selection>) {
        self.clear();
        self.undo_stack.push(UndoEntry {
            content: content.into(),
            selection,
            timestamp: Instant::now(),
        });
    }

    /// Records a new snapshot taken now.
    pub fn record(
        &mut self,
        content: impl Into<String>,
        selection: Option<Selection>,
    ) -> RecordOutcome {
        self.record_at(content, selection, Instant::now())
    }

    /// Records a new snapshot taken at `now`.
    ///
    /// Any fresh edit invalidates the redo stack.
    pub fn record_at(
        &mut self,
        content: impl Into<String>,
        selection: Option<Selection>,
        now: Instant,
    ) -> RecordOutcome {
        let entry = UndoEntry {
            content: content.into(),
            selection,
            timestamp: now,
        };
        self.redo_stack.clear();

        let outcome = if self.can_merge(&entry, now) {
            if let Some(top) = self.undo_stack.last_mut() {
                *top = entry;
            }
            RecordOutcome::Merged
        } else {
            self.undo_stack.push(entry);
            // Enforce size limit
            if self.undo_stack.len() > self.config.max_entries {
                let excess = self.undo_stack.len() - self.config.max_entries;
                self.undo_stack.drain(..excess);
            }
            RecordOutcome::Appended
        };

        self.last_record = Some(now);
        outcome
    }

    fn can_merge(&self, entry: &UndoEntry, now: Instant) -> bool {
        if !self.coalesce_enabled || self.undo_stack.len() < 2 {
            return false;
        }
        let Some(last) = self.last_record else {
            return false;
        };
        if now.saturating_duration_since(last) >= self.config.merge_window {
            return false;
        }
        let Some(top) = self.undo_stack.last() else {
            return false;
        };
        let new_len = entry.content.chars().count();
        let top_len = top.content.chars().count();
        new_len.abs_diff(top_len) < self.config.merge_threshold
    }

    /// Returns true if undo is available.
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    /// Returns true if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Steps back one entry and returns the snapshot to restore.
    pub fn undo(&mut self) -> Option<&UndoEntry> {
        if !self.can_undo() {
            return None;
        }
        let current = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.last_record = None;
        self.undo_stack.last()
    }

    /// Re-applies the most recently undone entry and returns it.
    pub fn redo(&mut self) -> Option<&UndoEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry);
        self.last_record = None;
        self.undo_stack.last()
    }

    /// Returns the current (top) entry.
    pub fn current(&self) -> Option<&UndoEntry> {
        self.undo_stack.last()
    }

    /// Number of entries on the undo stack, including the current one.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of entries on the redo stack.
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// When the last edit was recorded, if the coalescing chain is open.
    pub fn last_undo_time(&self) -> Option<Instant> {
        self.last_record
    }

    /// Clears all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.last_record = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> History {
        let mut history = History::default();
        history.seed("", None);
        history
    }

    #[test]
    fn test_undo_redo() {
        let mut history = seeded();
        let t0 = Instant::now();

        history.record_at("hello", None, t0);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let entry = history.undo().unwrap();
        assert_eq!(entry.content, "");
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let entry = history.redo().unwrap();
        assert_eq!(entry.content, "hello");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_needs_two_entries() {
        let mut history = seeded();
        assert!(history.undo().is_none());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_redo_cleared_on_new_edit() {
        let mut history = seeded();
        let t0 = Instant::now();
        history.record_at("a", None, t0);
        history.undo();
        assert!(history.can_redo());

        history.record_at("b", None, t0 + Duration::from_millis(10));
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_rapid_small_edits_coalesce() {
        let mut history = seeded();
        let t0 = Instant::now();

        assert_eq!(history.record_at("a", None, t0), RecordOutcome::Appended);
        assert_eq!(
            history.record_at("ab", None, t0 + Duration::from_millis(100)),
            RecordOutcome::Merged
        );
        assert_eq!(
            history.record_at("abc", None, t0 + Duration::from_millis(200)),
            RecordOutcome::Merged
        );

        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.current().unwrap().content, "abc");
        assert_eq!(history.undo().unwrap().content, "");
    }

    #[test]
    fn test_slow_edits_do_not_coalesce() {
        let mut history = seeded();
        let t0 = Instant::now();
        history.record_at("a", None, t0);
        history.record_at("ab", None, t0 + Duration::from_millis(1000));
        assert_eq!(history.undo_len(), 3);
    }

    #[test]
    fn test_window_measured_from_previous_record() {
        let mut history = seeded();
        let t0 = Instant::now();
        history.record_at("a", None, t0);
        history.record_at("ab", None, t0 + Duration::from_millis(900));
        history.record_at("abc", None, t0 + Duration::from_millis(1800));
        assert_eq!(history.undo_len(), 2);
    }

    #[test]
    fn test_large_edits_do_not_coalesce() {
        let mut history = seeded();
        let t0 = Instant::now();
        history.record_at("a", None, t0);
        history.record_at("a pasted paragraph", None, t0 + Duration::from_millis(50));
        assert_eq!(history.undo_len(), 3);
    }

    #[test]
    fn test_edit_after_undo_starts_new_step() {
        let mut history = seeded();
        let t0 = Instant::now();
        history.record_at("first", None, t0);
        history.record_at("first line two that is long", None, t0 + Duration::from_millis(10));
        assert_eq!(history.undo().unwrap().content, "first");

        history.record_at("firsts", None, t0 + Duration::from_millis(20));
        assert_eq!(history.undo_len(), 3);
        assert_eq!(history.undo().unwrap().content, "first");
    }

    #[test]
    fn test_max_entries_evicts_oldest() {
        let mut history = History::new(HistoryConfig {
            max_entries: 3,
            ..HistoryConfig::default()
        });
        history.set_coalesce_enabled(false);
        history.seed("0", None);
        for text in ["1", "2", "3", "4"] {
            history.record(text, None);
        }
        assert_eq!(history.undo_len(), 3);
        assert_eq!(history.undo().unwrap().content, "3");
        assert_eq!(history.undo().unwrap().content, "2");
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_coalescing_disabled() {
        let mut history = seeded();
        history.set_coalesce_enabled(false);
        let t0 = Instant::now();
        history.record_at("a", None, t0);
        history.record_at("ab", None, t0 + Duration::from_millis(1));
        assert_eq!(history.undo_len(), 3);
    }

    #[test]
    fn test_restores_selection() {
        let mut history = seeded();
        let sel = Selection::new(0, 5, "hello");
        history.record("hello world", Some(sel.clone()));
        history.record("hello world, this is a longer note", None);
        assert_eq!(history.undo().unwrap().selection, Some(sel));
    }
}
