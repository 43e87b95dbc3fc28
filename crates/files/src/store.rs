//! Namespaced file storage rooted at a single directory.
//!
//! This module provides [`FileStore`], the type every write to the storage tree goes
//! through. It covers three operations:
//!
//! - **Plain upload** ([`FileStore::upload`]): write a stream verbatim to a caller chosen
//!   relative path
//! - **Publish** ([`FileStore::hash_upload`], see `publish.rs`): stream through an MD5
//!   digest and a temp file, then atomically rename under the digest's sharded path
//! - **Move** ([`FileStore::move_file`]): relocate a stored file, creating parents
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//! ├── vfsNNNNNN                 # publish and spool staging files (short lived)
//! └── <namespace>/              # empty namespace = root itself
//!     ├── d/41/d41d8c…27e.jpg   # content-addressed files
//!     └── 202401/1_9.png        # foldered files
//! ```
//!
//! # Atomicity
//!
//! Only publish is atomic for readers. A plain upload writes in place, so a reader of
//! the same relative path can observe a partial file; callers that need atomicity
//! upload to a private temp path and [`FileStore::move_file`] it afterwards. Moves are
//! atomic only within one volume and never fall back to copy and delete.

use crate::config::VfsConfig;
use crate::constants::TEMP_FILE_PREFIX;
use crate::hash::ContentHash;
use crate::namespace::{validate_namespace_segment, validate_relative_path};
use crate::FilesResult;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Handle on the storage tree. Cheap to clone.
#[derive(Clone, Debug)]
pub struct FileStore {
    pub(crate) cfg: Arc<VfsConfig>,
}

impl FileStore {
    pub fn new(cfg: Arc<VfsConfig>) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &VfsConfig {
        &self.cfg
    }

    /// Absolute path of `rel` inside namespace `ns`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FilesError::InvalidPath`] if either part would escape the root.
    pub fn path(&self, ns: &str, rel: &str) -> FilesResult<PathBuf> {
        validate_namespace_segment(ns)?;
        validate_relative_path(rel)?;
        Ok(self.cfg.root_dir().join(ns).join(rel))
    }

    /// Absolute shard directory of `hash` inside namespace `ns`.
    pub fn full_dir(&self, ns: &str, hash: &ContentHash) -> FilesResult<PathBuf> {
        self.path(ns, &hash.shard_dir())
    }

    /// Absolute path of the content-addressed file for `hash` inside namespace `ns`.
    pub fn full_file(&self, ns: &str, hash: &ContentHash) -> FilesResult<PathBuf> {
        self.path(ns, &hash.storage_path())
    }

    /// Public URL path of a namespace, e.g. `/media/avatars`.
    pub fn web_path(&self, ns: &str) -> String {
        join_web(self.cfg.web_path(), &[ns])
    }

    /// Public URL path of a content-addressed file.
    pub fn web_hash_path(&self, ns: &str, hash: &ContentHash) -> String {
        join_web(self.cfg.web_path(), &[ns, &hash.storage_path()])
    }

    /// Writes `reader` to `rel` inside `ns`, creating parent directories as needed.
    ///
    /// The file is synced to disk before returning. The namespace allow-list is not
    /// consulted here; only path traversal is rejected.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the path is unsafe or any filesystem step fails.
    pub async fn upload<R>(&self, reader: &mut R, rel: &str, ns: &str) -> FilesResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.path(ns, rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;

        tracing::debug!("stored {} bytes at {}", written, path.display());
        Ok(written)
    }

    /// Renames `current` to `new` inside `ns`, creating the new parent directory first.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if either path is unsafe, the source is missing, or the
    /// rename fails (including across volumes).
    pub async fn move_file(&self, ns: &str, current: &str, new: &str) -> FilesResult<()> {
        let current = self.path(ns, current)?;
        let new = self.path(ns, new)?;

        if let Some(parent) = new.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&current, &new).await?;
        Ok(())
    }

    /// Buffers `reader` into an anonymous temp file in the storage root.
    ///
    /// Used when an upload body must be consumed before the request says where it
    /// goes. The file is removed when the returned [`SpooledUpload`] is dropped.
    pub async fn spool<R>(&self, reader: &mut R) -> FilesResult<SpooledUpload>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(self.cfg.root_dir())?;

        let mut file = fs::File::from_std(temp.reopen()?);
        let len = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;

        tracing::debug!("spooled {} bytes to {}", len, temp.path().display());
        Ok(SpooledUpload { temp, len })
    }

    /// Removes a stored file, used to discard staging files of failed uploads.
    pub(crate) async fn remove(&self, ns: &str, rel: &str) -> FilesResult<()> {
        let path = self.path(ns, rel)?;
        fs::remove_file(path).await?;
        Ok(())
    }
}

/// Upload body parked on disk until it can be dispatched.
#[derive(Debug)]
pub struct SpooledUpload {
    temp: NamedTempFile,
    len: u64,
}

impl SpooledUpload {
    /// Bytes spooled.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fresh reader positioned at the start of the spooled bytes.
    pub fn open(&self) -> FilesResult<fs::File> {
        Ok(fs::File::from_std(self.temp.reopen()?))
    }
}

fn join_web(base: &str, segments: &[&str]) -> String {
    let mut out = base.trim_end_matches('/').to_owned();
    for segment in segments.iter().filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment.trim_matches('/'));
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
