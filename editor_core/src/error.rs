//! Editor error types.

use thiserror::Error;

/// Errors returned by the editor store.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("plugin already registered: {0}")]
    DuplicatePlugin(String),

    #[error("command already registered: {0}")]
    DuplicateCommand(String),

    #[error("decoration already registered: {0}")]
    DuplicateDecoration(String),

    #[error("plugin '{0}' failed during setup")]
    PluginSetup(String),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command '{id}' failed: {source}")]
    CommandFailed {
        id: String,
        #[source]
        source: CommandError,
    },

    #[error("command '{0}' panicked")]
    CommandPanicked(String),

    #[error("selection {start}..{end} does not match the content ({len} chars)")]
    InvalidSelection { start: usize, end: usize, len: usize },
}

/// Error reported by a command body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
