//! Constants used throughout the VFS files crate.
//!
//! Path and naming constants live here so the on-disk layout is defined in one place.

/// Extension appended to every content-addressed file, whatever its real type.
pub const DEFAULT_HASH_EXTENSION: &str = "jpg";

/// The public namespace. Always valid, never needs to be configured.
pub const NAMESPACE_PUBLIC: &str = "";

/// Multipart field carrying the uploaded file when none is configured.
pub const DEFAULT_UPLOAD_FORM_NAME: &str = "file";

/// Prefix of the temp files staged in the storage root during a publish.
pub const TEMP_FILE_PREFIX: &str = "vfs";

/// Prefix of the temporary relative name a foldered upload lands under.
pub const TEMP_UPLOAD_PREFIX: &str = "temp";

/// Random characters appended to [`TEMP_UPLOAD_PREFIX`].
pub const TEMP_UPLOAD_NAME_LEN: usize = 16;

/// Random characters in a filename salt.
pub const SALT_LEN: usize = 8;

/// Buffer size for the single-pass hash-and-write copy.
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// MIME type reported when sniffing succeeds but matches nothing.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// MIME type reported for content that sniffs as UTF-8 text.
pub const TEXT_MIME_TYPE: &str = "text/plain; charset=utf-8";

/// Bytes inspected when deciding whether unrecognised content is text.
pub const TEXT_SNIFF_LEN: usize = 3072;

/// Default storage root when no explicit directory is configured.
pub const DEFAULT_ROOT_DIR: &str = "vfs_data";

/// Default public web prefix.
pub const DEFAULT_WEB_PATH: &str = "/media";

/// Default maximum upload size (32 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 32 * 1024 * 1024;
