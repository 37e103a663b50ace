//! Editor configuration.

use crate::history::HistoryConfig;
use crate::stats::DEFAULT_WORDS_PER_MINUTE;

/// Settings fixed for the lifetime of an [`Editor`](crate::Editor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorConfig {
    pub history: HistoryConfig,
    /// Reading speed used for the reading time estimate.
    pub words_per_minute: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }
}
