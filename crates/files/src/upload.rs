//! Upload orchestration.
//!
//! [`UploadService`] turns one upload (a reader plus what the transport knows about
//! it) into either a published content hash or a foldered file with a persisted
//! [`VfsFile`] record. It is transport agnostic; the HTTP crate classifies requests
//! into an [`UploadSource`] and maps [`UploadError`] to status codes.
//!
//! Foldered uploads run in this order:
//!
//! 1. land the bytes at `temp<16 random chars>` inside the namespace
//! 2. allocate the next file id
//! 3. move to `<YYYYMM>/<folder>_<id>[_<salt>].<ext>`
//! 4. extract metadata from the final path
//! 5. persist the record
//!
//! Failures before step 3 remove the temp file. A failure in step 4 or 5 leaves the
//! moved file where it is; nothing is rolled back once the file has its final name.

use crate::constants::{SALT_LEN, TEMP_UPLOAD_NAME_LEN, TEMP_UPLOAD_PREFIX};
use crate::hash::ContentHash;
use crate::metadata::extract_metadata;
use crate::names::NameGenerator;
use crate::repository::{FileStatus, RepositoryError, VfsFile, VfsRepository};
use crate::store::{FileStore, SpooledUpload};
use crate::FilesError;
use chrono::{DateTime, Utc};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Errors that end an upload request.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Declared or streamed size is above the configured maximum
    #[error("file size exceed {max} bytes")]
    TooLarge { max: u64 },

    /// Malformed request: bad form values, missing file part, unparseable multipart
    #[error("invalid request: {0}")]
    Validation(String),

    /// The target folder does not exist
    #[error("folder {0} not found")]
    FolderNotFound(i64),

    /// The repository failed while looking up the folder
    #[error("folder lookup failed: {0}")]
    FolderLookup(#[source] RepositoryError),

    /// Id allocation or record insertion failed
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Storage layer error
    #[error(transparent)]
    Files(#[from] FilesError),
}

/// One incoming upload body.
pub struct UploadSource<R> {
    pub reader: R,
    /// Size announced by the transport, trusted as-is when present
    pub declared_size: Option<u64>,
    /// Client side filename, multipart uploads only
    pub original_filename: Option<String>,
}

impl<R> UploadSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            declared_size: None,
            original_filename: None,
        }
    }

    pub fn with_declared_size(mut self, size: Option<u64>) -> Self {
        self.declared_size = size;
        self
    }

    pub fn with_original_filename(mut self, filename: Option<String>) -> Self {
        self.original_filename = filename;
        self
    }
}

/// Result of a hash-only upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashUpload {
    pub hash: ContentHash,
    pub web_path: String,
}

/// Result of a foldered upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderUpload {
    pub file: VfsFile,
    pub name: String,
    pub ext: String,
}

/// Base name and extension of a client filename.
///
/// The extension is whatever follows the last `.` of the final path segment, without
/// the dot; `photo.tar.gz` gives `("photo.tar", "gz")`, `README` gives `("README", "")`.
pub fn split_filename(filename: &str) -> (String, String) {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    match base.rfind('.') {
        Some(dot) => (base[..dot].to_owned(), base[dot + 1..].to_owned()),
        None => (base.to_owned(), String::new()),
    }
}

/// `<folder>_<id>[_<salt>].<ext>`, with no trailing dot when `ext` is empty.
pub fn foldered_filename(folder_id: i64, file_id: i64, salt: Option<&str>, ext: &str) -> String {
    let mut name = format!("{}_{}", folder_id, file_id);
    if let Some(salt) = salt {
        name.push('_');
        name.push_str(salt);
    }
    if !ext.is_empty() {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Coordinates storage, metadata extraction and the repository for uploads.
#[derive(Clone)]
pub struct UploadService {
    store: FileStore,
    repository: Arc<dyn VfsRepository>,
    names: Arc<dyn NameGenerator>,
}

impl UploadService {
    pub fn new(
        store: FileStore,
        repository: Arc<dyn VfsRepository>,
        names: Arc<dyn NameGenerator>,
    ) -> Self {
        Self {
            store,
            repository,
            names,
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Parks an upload body on disk, capped at the configured maximum.
    ///
    /// The spooled length can then be passed on as the declared size.
    ///
    /// # Errors
    ///
    /// - [`UploadError::TooLarge`] once the body passes the maximum; nothing is kept
    /// - [`UploadError::Files`] if the temp file cannot be written
    pub async fn spool<R>(&self, reader: R) -> Result<SpooledUpload, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let max = self.store.config().max_file_size();
        let mut reader = SizeLimited::new(reader, max);
        self.store
            .spool(&mut reader)
            .await
            .map_err(|e| too_large_or(e, max))
    }

    /// Publishes the body under its content hash.
    ///
    /// # Errors
    ///
    /// - [`UploadError::TooLarge`] if the declared size is above the maximum (nothing is
    ///   read), or if no size was declared and the body turns out too big
    /// - [`UploadError::Files`] for namespace and storage failures
    pub async fn hash_upload<R>(
        &self,
        source: UploadSource<R>,
        ns: &str,
    ) -> Result<HashUpload, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let max = self.store.config().max_file_size();
        let mut reader = self.guard_size(source.reader, source.declared_size)?;

        let hash = self
            .store
            .hash_upload(&mut reader, ns)
            .await
            .map_err(|e| too_large_or(e, max))?;

        Ok(HashUpload {
            web_path: self.store.web_hash_path(ns, &hash),
            hash,
        })
    }

    /// Stores the body as a new file of folder `folder_id` and records it.
    ///
    /// # Errors
    ///
    /// - [`UploadError::TooLarge`] as for [`Self::hash_upload`]
    /// - [`UploadError::FolderNotFound`] / [`UploadError::FolderLookup`]
    /// - [`UploadError::Repository`] if id allocation or insertion fails
    /// - [`UploadError::Files`] for storage failures
    pub async fn folder_upload<R>(
        &self,
        source: UploadSource<R>,
        ns: &str,
        folder_id: i64,
    ) -> Result<FolderUpload, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let max = self.store.config().max_file_size();
        let (name, ext) = source
            .original_filename
            .as_deref()
            .map(split_filename)
            .unwrap_or_default();
        let mut reader = self.guard_size(source.reader, source.declared_size)?;

        let folder = self
            .repository
            .folder_by_id(folder_id)
            .await
            .map_err(UploadError::FolderLookup)?
            .ok_or(UploadError::FolderNotFound(folder_id))?;

        let temp_name = format!(
            "{}{}",
            TEMP_UPLOAD_PREFIX,
            self.names.random_seq(TEMP_UPLOAD_NAME_LEN)
        );

        if let Err(e) = self.store.upload(&mut reader, &temp_name, ns).await {
            self.discard_temp(ns, &temp_name).await;
            return Err(too_large_or(e, max));
        }

        let file_id = match self.repository.next_file_id().await {
            Ok(id) => id,
            Err(e) => {
                self.discard_temp(ns, &temp_name).await;
                return Err(e.into());
            }
        };

        let salt = self
            .store
            .config()
            .salted_filenames()
            .then(|| self.names.random_seq(SALT_LEN));
        let created_at = Utc::now();
        let path = final_relative_path(
            created_at,
            &foldered_filename(folder.id, file_id, salt.as_deref(), &ext),
        );

        if let Err(e) = self.store.move_file(ns, &temp_name, &path).await {
            self.discard_temp(ns, &temp_name).await;
            return Err(e.into());
        }

        let absolute = self.store.path(ns, &path)?;
        let metadata = tokio::task::spawn_blocking(move || extract_metadata(&absolute))
            .await
            .map_err(|e| FilesError::Io(io::Error::other(e)))??;

        let record = VfsFile {
            id: file_id,
            folder_id: folder.id,
            title: name.clone(),
            path: path.clone(),
            params: metadata.dimensions,
            mime_type: metadata.mime_type.unwrap_or_default(),
            file_size: metadata.size_bytes,
            file_exists: true,
            status: FileStatus::Enabled,
            created_at,
        };

        let file = self.repository.add_file(record).await.map_err(|e| {
            tracing::error!(
                "record insert failed, leaving orphaned file '{}' in namespace '{}': {}",
                path,
                ns,
                e
            );
            UploadError::Repository(e)
        })?;

        tracing::info!(
            "stored file {} of folder {} at '{}' in namespace '{}'",
            file.id,
            folder.id,
            file.path,
            ns
        );

        Ok(FolderUpload { file, name, ext })
    }

    /// Rejects oversized declared bodies and caps undeclared ones.
    fn guard_size<R>(
        &self,
        reader: R,
        declared: Option<u64>,
    ) -> Result<SizeLimited<R>, UploadError> {
        let max = self.store.config().max_file_size();
        match declared {
            Some(size) if size > max => Err(UploadError::TooLarge { max }),
            Some(_) => Ok(SizeLimited::unbounded(reader)),
            None => Ok(SizeLimited::new(reader, max)),
        }
    }

    async fn discard_temp(&self, ns: &str, temp_name: &str) {
        if let Err(e) = self.store.remove(ns, temp_name).await {
            tracing::warn!(
                "failed to remove staged upload '{}' in namespace '{}': {}",
                temp_name,
                ns,
                e
            );
        }
    }
}

/// `<YYYYMM>/<filename>`.
fn final_relative_path(now: DateTime<Utc>, filename: &str) -> String {
    format!("{}/{}", now.format("%Y%m"), filename)
}

fn too_large_or(err: FilesError, max: u64) -> UploadError {
    match &err {
        FilesError::Io(e)
            if e
                .get_ref()
                .is_some_and(|inner| inner.is::<SizeLimitExceeded>()) =>
        {
            UploadError::TooLarge { max }
        }
        _ => UploadError::Files(err),
    }
}

/// Marker error carried inside `io::Error` when a [`SizeLimited`] reader overflows.
#[derive(Debug, thiserror::Error)]
#[error("upload exceeds {0} bytes")]
pub struct SizeLimitExceeded(pub u64);

/// Reader that fails once more than `limit` bytes have been read.
pub struct SizeLimited<R> {
    inner: R,
    remaining: Option<u64>,
    limit: u64,
}

impl<R> SizeLimited<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: Some(limit),
            limit,
        }
    }

    /// Pass-through reader; used when the declared size is trusted.
    pub fn unbounded(inner: R) -> Self {
        Self {
            inner,
            remaining: None,
            limit: u64::MAX,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for SizeLimited<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let read = (buf.filled().len() - before) as u64;
                if let Some(remaining) = this.remaining.as_mut() {
                    if read > *remaining {
                        // Nothing may stay filled on an error return.
                        buf.set_filled(before);
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            SizeLimitExceeded(this.limit),
                        )));
                    }
                    *remaining -= read;
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
