//! services/api/src/adapters/storage.rs
//!
//! This module contains the storage adapter, the concrete implementation of
//! the `StorageService` port. Every key is one JSON file under the data
//! directory, so the whole state can be inspected or backed up by hand.

use async_trait::async_trait;
use math_mentor_core::ports::{PortError, PortResult, StorageService};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed adapter that implements the `StorageService` port.
#[derive(Clone, Debug)]
pub struct FileStorageAdapter {
    data_dir: PathBuf,
}

impl FileStorageAdapter {
    /// Creates a new `FileStorageAdapter`. The directory is created lazily on
    /// the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Keys become file names, so only a conservative alphabet is accepted.
    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PortError::Unexpected(format!(
                "Invalid storage key '{}'",
                key
            )));
        }
        Ok(self.data_dir.join(format!("{}.json", key)))
    }
}

//=========================================================================================
// `StorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StorageService for FileStorageAdapter {
    async fn load_item(&self, key: &str) -> PortResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Writes to a sibling temp file first, then renames it over the target so
    /// a crash mid-write never leaves a truncated file behind.
    async fn save_item(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to create data dir: {}", e)))?;

        let tmp_path = self.data_dir.join(format!("{}.json.tmp", key));
        tokio::fs::write(&tmp_path, value)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write {}: {}", key, e)))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to replace {}: {}", key, e)))?;

        debug!("Saved {} bytes under '{}'.", value.len(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorageAdapter::new(dir.path());
        assert_eq!(storage.load_item("math_errors").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorageAdapter::new(dir.path().join("nested"));

        storage.save_item("math_errors", "[]").await.unwrap();
        storage.save_item("math_errors", "[{\"id\":1}]").await.unwrap();

        assert_eq!(
            storage.load_item("math_errors").await.unwrap().as_deref(),
            Some("[{\"id\":1}]")
        );
        assert!(dir.path().join("nested/math_errors.json").exists());
        assert!(!dir.path().join("nested/math_errors.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorageAdapter::new(dir.path());
        assert!(storage.save_item("../escape", "x").await.is_err());
        assert!(storage.load_item("").await.is_err());
    }
}
