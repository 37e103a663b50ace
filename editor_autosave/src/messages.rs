//! Messages exchanged between the host and the autosave worker.

use crate::store::{NoteDraft, SavedNote};
use note_editor_core::SaveStatus;
use serde::Serialize;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Errors returned to callers waiting on the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutosaveError {
    #[error("autosave worker has stopped")]
    Stopped,

    #[error("save failed: {0}")]
    SaveFailed(String),
}

pub(crate) type FlushReply = oneshot::Sender<Result<(), AutosaveError>>;

/// Requests from the host to the worker.
pub(crate) enum AutosaveMessage {
    /// The note changed; restarts the debounce timer.
    ContentChanged(NoteDraft),
    /// Persist the newest snapshot now.
    Flush(Option<FlushReply>),
    /// Flush, then stop the worker.
    Shutdown(FlushReply),
}

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PipelineState {
    #[default]
    Idle,
    /// Waiting for the user to stop typing.
    Debouncing,
    /// Operations are queued but none is running.
    Queued,
    Saving,
    /// The front operation failed and waits for its next attempt.
    Retrying { attempt: u32 },
    /// An operation was dropped after exhausting its retries.
    Error,
}

/// Latest pipeline status, published on a watch channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AutosaveStatus {
    pub state: PipelineState,
    pub has_unsaved_changes: bool,
    pub last_saved_at: Option<SystemTime>,
    pub last_error: Option<String>,
    /// Operations waiting in the queue, including one in flight.
    pub queued: usize,
}

impl AutosaveStatus {
    /// Maps the pipeline status onto the indicator the editor shows.
    pub fn save_status(&self) -> SaveStatus {
        match self.state {
            PipelineState::Saving | PipelineState::Retrying { .. } => SaveStatus::Saving,
            PipelineState::Error => SaveStatus::Error,
            PipelineState::Debouncing | PipelineState::Queued => SaveStatus::Unsaved,
            PipelineState::Idle if self.has_unsaved_changes => SaveStatus::Unsaved,
            PipelineState::Idle => SaveStatus::Saved,
        }
    }
}

/// Notifications from the worker, polled by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum AutosaveEvent {
    StatusChanged(AutosaveStatus),
    Saving { operation: Uuid, attempt: u32 },
    Saved { operation: Uuid, note: SavedNote },
    Failed {
        operation: Uuid,
        attempt: u32,
        error: String,
        will_retry: bool,
    },
    /// A queued operation was discarded because the queue was full.
    Evicted { operation: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_status_mapping() {
        let mut status = AutosaveStatus::default();
        assert_eq!(status.save_status(), SaveStatus::Saved);

        status.has_unsaved_changes = true;
        assert_eq!(status.save_status(), SaveStatus::Unsaved);

        status.state = PipelineState::Retrying { attempt: 2 };
        assert_eq!(status.save_status(), SaveStatus::Saving);

        status.state = PipelineState::Error;
        assert_eq!(status.save_status(), SaveStatus::Error);
    }
}
