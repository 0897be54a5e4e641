use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The only locally persisted piece of session state.
///
/// It answers "does a user appear to be signed in" for display and route
/// gating; it is never a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Email of the signed-in user.
    pub email: String,
}

/// Storage medium for the [`SessionRecord`].
pub trait SessionPersistence: Send + Sync {
    /// Read the stored record, `None` when nothing is stored.
    fn load(&self) -> Result<Option<SessionRecord>>;
    /// Replace the stored record.
    fn store(&self, record: &SessionRecord) -> Result<()>;
    /// Erase the stored record; erasing nothing is not an error.
    fn clear(&self) -> Result<()>;
}

/// Keeps the record as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    /// Persist to the given file, created on first store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionPersistence {
    fn load(&self) -> Result<Option<SessionRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session {}", self.path.display()))?;
        let record = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse session {}", self.path.display()))?;
        Ok(Some(record))
    }

    fn store(&self, record: &SessionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create session directory {}", parent.display())
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(record).context("failed to serialize session record")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write session {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove session {}", self.path.display())),
        }
    }
}

/// Process-local storage, used by tests and ephemeral front-ends.
#[derive(Debug, Default)]
pub struct MemorySessionPersistence {
    record: Mutex<Option<SessionRecord>>,
}

impl MemorySessionPersistence {
    /// Start with `record` already stored.
    pub fn with_record(record: SessionRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl SessionPersistence for MemorySessionPersistence {
    fn load(&self) -> Result<Option<SessionRecord>> {
        Ok(self.record.lock().clone())
    }

    fn store(&self, record: &SessionRecord) -> Result<()> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.record.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_record_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let persistence = FileSessionPersistence::new(dir.path().join("state").join("session.json"));
        assert_eq!(persistence.load()?, None);

        let record = SessionRecord {
            email: "a@b.io".to_string(),
        };
        persistence.store(&record)?;
        assert!(persistence.path().exists());
        assert_eq!(persistence.load()?, Some(record));

        persistence.clear()?;
        assert_eq!(persistence.load()?, None);
        persistence.clear()?;
        Ok(())
    }

    #[test]
    fn corrupt_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json")?;
        assert!(FileSessionPersistence::new(&path).load().is_err());
        Ok(())
    }
}
