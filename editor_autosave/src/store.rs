//! Persistence backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Title used when a note has no text yet.
pub const UNTITLED: &str = "Untitled";

/// Snapshot of a note as sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Builds a draft whose title is the first non-blank line of `content`,
    /// without leading heading markers.
    pub fn from_content(content: &str) -> Self {
        let title = content
            .lines()
            .map(|line| line.trim_start_matches('#').trim())
            .find(|line| !line.is_empty())
            .unwrap_or(UNTITLED);
        Self::new(title, content)
    }
}

/// Acknowledgement returned by a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNote {
    pub note_id: String,
    pub saved_at: SystemTime,
}

/// Errors reported by a [`NoteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("save rejected: {0}")]
    Rejected(String),

    #[error("store unavailable")]
    Unavailable,
}

/// A backend notes are persisted to.
///
/// Implementations must return `Err` on any failure and must accept the same
/// payload more than once.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn save(&self, note_id: &str, draft: &NoteDraft) -> Result<SavedNote, StoreError>;
}

/// Stores each note as `<dir>/<note_id>.md`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a note is stored in.
    pub fn path_for(&self, note_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !note_id.is_empty()
            && !note_id.starts_with('.')
            && !note_id.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::Rejected(format!("invalid note id '{note_id}'")));
        }
        Ok(self.dir.join(format!("{note_id}.md")))
    }

    /// Reads a note. Returns `Ok(None)` if it was never saved.
    pub async fn load(&self, note_id: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(note_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl NoteStore for FileStore {
    async fn save(&self, note_id: &str, draft: &NoteDraft) -> Result<SavedNote, StoreError> {
        let path = self.path_for(note_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write then rename so readers never see a partial note.
        let tmp = self.dir.join(format!(".{note_id}.md.tmp"));
        tokio::fs::write(&tmp, draft.content.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        log::debug!("Wrote {} ({} bytes)", path.display(), draft.content.len());
        Ok(SavedNote {
            note_id: note_id.to_string(),
            saved_at: SystemTime::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_content() {
        assert_eq!(NoteDraft::from_content("# Groceries\n- milk").title, "Groceries");
        assert_eq!(NoteDraft::from_content("\n\n  plan  \nmore").title, "plan");
        assert_eq!(NoteDraft::from_content("").title, UNTITLED);
        assert_eq!(NoteDraft::from_content("###\n").title, UNTITLED);
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let store = FileStore::new("/notes");
        assert_eq!(
            store.path_for("today").unwrap(),
            PathBuf::from("/notes/today.md")
        );
        assert!(matches!(store.path_for("../etc"), Err(StoreError::Rejected(_))));
        assert!(store.path_for("").is_err());
        assert!(store.path_for(".hidden").is_err());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.load("n1").await.unwrap(), None);

        store.save("n1", &NoteDraft::from_content("first")).await.unwrap();
        let saved = store.save("n1", &NoteDraft::from_content("second")).await.unwrap();

        assert_eq!(saved.note_id, "n1");
        assert_eq!(store.load("n1").await.unwrap().as_deref(), Some("second"));
        let leftovers: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
