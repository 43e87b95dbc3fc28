//! VFS File Storage
//!
//! This crate provides the storage core of the VFS service: namespaced,
//! content-addressed file storage and the pipeline that turns an upload into a
//! durable file and, for foldered uploads, a metadata record.
//!
//! ## Design Principles
//!
//! - Content-addressed files are published atomically: a hash is either absent or
//!   fully written and synced
//! - Identical bytes always map to the same hash and path, whatever the namespace
//! - Namespaces partition the root; only allow-listed ones accept published content
//! - Records are persisted after their file is in place, never before
//! - Configuration is an immutable value passed in, never global state
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//! └── <namespace>/                         # "" = public, stored at the root
//!     ├── <h0>/<h1h2>/<hash>.jpg           # content-addressed
//!     └── <YYYYMM>/<folder>_<id>[_salt].ext # foldered
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use vfs_files::{FileStore, Namespaces, VfsConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = VfsConfig::new(
//!     Path::new("vfs_data"),
//!     "/media",
//!     32 * 1024 * 1024,
//!     Namespaces::new(["avatars"])?,
//!     "file",
//!     false,
//! )?;
//! let store = FileStore::new(Arc::new(cfg));
//!
//! let mut body: &[u8] = b"hello";
//! let hash = store.hash_upload(&mut body, "avatars").await?;
//! println!("{}", store.web_hash_path("avatars", &hash));
//! # Ok(())
//! # }
//! ```

pub mod config;
mod constants;
mod hash;
pub mod metadata;
mod names;
mod namespace;
mod publish;
pub mod repository;
mod store;
pub mod upload;

pub use config::VfsConfig;
pub use constants::{
    DEFAULT_HASH_EXTENSION, DEFAULT_MAX_FILE_SIZE, DEFAULT_UPLOAD_FORM_NAME, NAMESPACE_PUBLIC,
};
pub use hash::ContentHash;
pub use metadata::{extract_metadata, FileMetadata, ImageDimensions};
pub use names::{NameGenerator, RandomNames};
pub use namespace::Namespaces;
pub use repository::{
    FileStatus, InMemoryRepository, RepositoryError, VfsFile, VfsFolder, VfsRepository,
};
pub use store::{FileStore, SpooledUpload};
pub use upload::{FolderUpload, HashUpload, UploadError, UploadService, UploadSource};

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Namespace is not public and not in the allow-list
    #[error("invalid namespace: '{0}'")]
    InvalidNamespace(String),

    /// Path validation failed (directory traversal or unsafe segment)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type FilesResult<T> = Result<T, FilesError>;
