//! Save storage backends
//!
//! The game persists a single JSON document. Storage only moves strings;
//! parsing and validation belong to the caller.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::StorageError;

/// File name used by [`FileStorage::default_location`]
pub const SAVE_FILE_NAME: &str = "save.json";

/// Where the game's save document lives
pub trait SaveStorage: Send + Sync {
    /// Stored document, `None` if nothing has been saved yet
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored document
    fn save(&self, document: &str) -> Result<(), StorageError>;

    /// Delete the stored document
    fn clear(&self) -> Result<(), StorageError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON document on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_local_dir>/SpinForge/save.json`
    pub fn default_location() -> Self {
        Self::new(default_save_dir().join(SAVE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn default_save_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("SpinForge")
}

impl SaveStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, document: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // atomic replace
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, document)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!("[Storage] saved {} bytes to {:?}", document.len(), self.path);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY
// ═══════════════════════════════════════════════════════════════════════════════

/// In-process storage for tests and headless runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    document: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with a document
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
        }
    }

    /// Current contents
    pub fn contents(&self) -> Option<String> {
        self.document.lock().clone()
    }
}

impl SaveStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &str) -> Result<(), StorageError> {
        *self.document.lock() = Some(document.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.document.lock() = None;
        Ok(())
    }
}

/// Storage that refuses every operation (private browsing, read-only media)
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl SaveStorage for UnavailableStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("no storage backend".into()))
    }

    fn save(&self, _document: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("no storage backend".into()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("no storage backend".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("save.json"));

        assert_eq!(storage.load().unwrap(), None);
        storage.save(r#"{"credits":1000}"#).unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some(r#"{"credits":1000}"#));

        storage.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
        storage.clear().unwrap();
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::with_document("{}");
        assert_eq!(storage.load().unwrap().as_deref(), Some("{}"));
        storage.save("[]").unwrap();
        assert_eq!(storage.contents().as_deref(), Some("[]"));
    }

    #[test]
    fn test_unavailable_storage() {
        let storage = UnavailableStorage;
        assert!(matches!(storage.load(), Err(StorageError::Unavailable(_))));
        assert!(storage.save("x").is_err());
    }

    #[test]
    fn test_default_location_file_name() {
        let storage = FileStorage::default_location();
        assert!(storage.path().ends_with(SAVE_FILE_NAME));
    }
}
