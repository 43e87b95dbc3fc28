//! Metadata repository collaborator.
//!
//! Folder lookup, file id allocation and record insertion belong to an external
//! persistence engine. The upload pipeline only sees the [`VfsRepository`] trait,
//! which is exactly those three operations. [`InMemoryRepository`] backs local runs
//! and tests.

use crate::metadata::ImageDimensions;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

/// Errors reported by a repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The backing store rejected or failed the operation
    #[error("repository backend error: {0}")]
    Backend(String),

    /// A record with this id already exists
    #[error("file {0} already exists")]
    DuplicateFile(i64),
}

impl<T> From<PoisonError<T>> for RepositoryError {
    fn from(e: PoisonError<T>) -> Self {
        RepositoryError::Backend(format!("lock poisoned: {}", e))
    }
}

/// A folder that foldered uploads attach files to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VfsFolder {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
}

/// Lifecycle status of a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Enabled,
    Disabled,
    Deleted,
}

/// Metadata record describing one foldered file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VfsFile {
    pub id: i64,
    pub folder_id: i64,
    pub title: String,
    /// Path relative to the namespace directory, e.g. `202401/1_9.png`
    pub path: String,
    pub params: Option<ImageDimensions>,
    pub mime_type: String,
    pub file_size: u64,
    pub file_exists: bool,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait VfsRepository: Send + Sync {
    /// Looks up a folder; `Ok(None)` when it does not exist.
    async fn folder_by_id(&self, id: i64) -> Result<Option<VfsFolder>, RepositoryError>;

    /// Allocates the next sequential file id.
    async fn next_file_id(&self) -> Result<i64, RepositoryError>;

    /// Persists a record and returns it as stored.
    async fn add_file(&self, file: VfsFile) -> Result<VfsFile, RepositoryError>;
}

/// Process-local repository. Ids start at 1 and are not persisted across restarts.
#[derive(Debug)]
pub struct InMemoryRepository {
    folders: RwLock<HashMap<i64, VfsFolder>>,
    files: Mutex<Vec<VfsFile>>,
    last_file_id: AtomicI64,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            folders: RwLock::new(HashMap::new()),
            files: Mutex::new(Vec::new()),
            last_file_id: AtomicI64::new(0),
        }
    }

    /// Registers a folder, replacing any folder with the same id.
    pub fn insert_folder(&self, folder: VfsFolder) -> Result<(), RepositoryError> {
        self.folders.write()?.insert(folder.id, folder);
        Ok(())
    }

    /// Snapshot of all stored records, in insertion order.
    pub fn files(&self) -> Result<Vec<VfsFile>, RepositoryError> {
        Ok(self.files.lock()?.clone())
    }
}

#[async_trait]
impl VfsRepository for InMemoryRepository {
    async fn folder_by_id(&self, id: i64) -> Result<Option<VfsFolder>, RepositoryError> {
        Ok(self.folders.read()?.get(&id).cloned())
    }

    async fn next_file_id(&self) -> Result<i64, RepositoryError> {
        Ok(self.last_file_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn add_file(&self, file: VfsFile) -> Result<VfsFile, RepositoryError> {
        let mut files = self.files.lock()?;
        if files.iter().any(|f| f.id == file.id) {
            return Err(RepositoryError::DuplicateFile(file.id));
        }
        files.push(file.clone());
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> VfsFile {
        VfsFile {
            id,
            folder_id: 1,
            title: "photo".into(),
            path: format!("202401/1_{}.png", id),
            params: Some(ImageDimensions {
                width: 10,
                height: 20,
            }),
            mime_type: "image/png".into(),
            file_size: 42,
            file_exists: true,
            status: FileStatus::Enabled,
            created_at: "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_folder_lookup() {
        let repo = InMemoryRepository::new();
        repo.insert_folder(VfsFolder {
            id: 7,
            parent_id: None,
            title: "gallery".into(),
        })
        .unwrap();

        assert_eq!(repo.folder_by_id(7).await.unwrap().unwrap().title, "gallery");
        assert!(repo.folder_by_id(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_file_id_is_sequential() {
        let repo = InMemoryRepository::new();

        assert_eq!(repo.next_file_id().await.unwrap(), 1);
        assert_eq!(repo.next_file_id().await.unwrap(), 2);
        assert_eq!(repo.next_file_id().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_add_file_rejects_duplicate_id() {
        let repo = InMemoryRepository::new();

        repo.add_file(record(1)).await.unwrap();
        let result = repo.add_file(record(1)).await;

        assert!(matches!(result, Err(RepositoryError::DuplicateFile(1))));
        assert_eq!(repo.files().unwrap().len(), 1);
    }

    #[test]
    fn test_file_record_serialization() {
        let json = serde_json::to_value(record(9)).unwrap();

        assert_eq!(json["status"], "enabled");
        assert_eq!(json["params"]["width"], 10);
        assert_eq!(json["path"], "202401/1_9.png");
    }
}
