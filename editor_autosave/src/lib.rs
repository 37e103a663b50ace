//! Autosave - Debounced, ordered persistence for Note Editor.
//!
//! Saving runs on a tokio task isolated from the editor. The editor feeds it
//! through an [`AutosavePlugin`]; the host polls [`AutosaveEvent`]s or
//! watches the [`AutosaveStatus`] channel.

pub mod config;
pub mod messages;
pub mod pipeline;
pub mod plugin;
pub mod store;

pub use config::AutosaveConfig;
pub use messages::{AutosaveError, AutosaveEvent, AutosaveStatus, PipelineState};
pub use pipeline::{Autosave, AutosaveHandle};
pub use plugin::{sync_save_status, AutosavePlugin, AUTOSAVE_PLUGIN_ID};
pub use store::{FileStore, NoteDraft, NoteStore, SavedNote, StoreError};
