//! Content-addressed publish.
//!
//! The input is read exactly once. Every chunk goes into an MD5 accumulator and a
//! temp file created in the storage root. The temp file is synced, then renamed onto
//! `<ns>/<shard>/<hash>.jpg`. Readers therefore see either nothing or the complete
//! file at a content address, never a prefix.
//!
//! Two publishes of the same bytes race to the same destination; the last rename
//! wins and both results are identical. There is no lock.

use crate::constants::{COPY_BUFFER_SIZE, TEMP_FILE_PREFIX};
use crate::hash::ContentHash;
use crate::store::FileStore;
use crate::{FilesError, FilesResult};
use md5::{Digest, Md5};
use tempfile::{NamedTempFile, PersistError};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

impl FileStore {
    /// Streams `reader` into content-addressed storage under namespace `ns`.
    ///
    /// # Returns
    ///
    /// The content hash; the published location is [`FileStore::full_file`].
    ///
    /// # Errors
    ///
    /// - [`FilesError::InvalidNamespace`] before any I/O if `ns` is not allowed
    /// - [`FilesError::Io`] for read, write, sync, mkdir or rename failures. The temp
    ///   file is removed; a failure to remove it is logged and never replaces the
    ///   original error.
    pub async fn hash_upload<R>(&self, reader: &mut R, ns: &str) -> FilesResult<ContentHash>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if !self.cfg.is_valid_namespace(ns) {
            return Err(FilesError::InvalidNamespace(ns.to_owned()));
        }

        let temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(self.cfg.root_dir())?;

        let hash = match stream_to_temp(reader, &temp).await {
            Ok(hash) => hash,
            Err(err) => return Err(discard_temp(temp, err)),
        };

        let destination = match self.prepare_destination(ns, &hash).await {
            Ok(path) => path,
            Err(err) => return Err(discard_temp(temp, err)),
        };

        match temp.persist(&destination) {
            Ok(_) => {
                tracing::info!("published {} in namespace '{}'", hash, ns);
                Ok(hash)
            }
            Err(PersistError { error, file }) => Err(discard_temp(file, error.into())),
        }
    }

    async fn prepare_destination(
        &self,
        ns: &str,
        hash: &ContentHash,
    ) -> FilesResult<std::path::PathBuf> {
        fs::create_dir_all(self.full_dir(ns, hash)?).await?;
        self.full_file(ns, hash)
    }
}

/// Copies `reader` into `temp` while hashing, then syncs the data to disk.
async fn stream_to_temp<R>(reader: &mut R, temp: &NamedTempFile) -> FilesResult<ContentHash>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = fs::File::from_std(temp.reopen()?);
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        file.write_all(&buffer[..read]).await?;
    }

    file.flush().await?;
    // fsync before the rename makes the content durable before it is addressable
    file.sync_all().await?;

    let digest: [u8; 16] = hasher.finalize().into();
    Ok(ContentHash::from_digest(&digest))
}

/// Deletes the temp file and hands back `err`, the first failure.
fn discard_temp(temp: NamedTempFile, err: FilesError) -> FilesError {
    let path = temp.path().to_path_buf();
    if let Err(cleanup) = temp.close() {
        tracing::warn!(
            "failed to remove temp file {}: {} (original error: {})",
            path.display(),
            cleanup,
            err
        );
    }
    err
}
