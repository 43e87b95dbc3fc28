//! Storage configuration.
//!
//! Resolved once at process startup and shared through `Arc` with every service.
//! Nothing in the request path reads environment variables.

use crate::constants::{
    DEFAULT_MAX_FILE_SIZE, DEFAULT_ROOT_DIR, DEFAULT_UPLOAD_FORM_NAME, DEFAULT_WEB_PATH,
};
use crate::namespace::Namespaces;
use crate::{FilesError, FilesResult};
use std::path::{Path, PathBuf};

/// Storage configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct VfsConfig {
    root_dir: PathBuf,
    web_path: String,
    max_file_size: u64,
    namespaces: Namespaces,
    upload_form_name: String,
    salted_filenames: bool,
}

impl VfsConfig {
    /// Create a new `VfsConfig`.
    ///
    /// An empty `upload_form_name` falls back to `file`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the root directory does not exist, is not a directory or cannot be canonicalised
    /// - a namespace is not a single safe path segment
    pub fn new(
        root_dir: &Path,
        web_path: impl Into<String>,
        max_file_size: u64,
        namespaces: Namespaces,
        upload_form_name: impl Into<String>,
        salted_filenames: bool,
    ) -> FilesResult<Self> {
        if !root_dir.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_dir.display()
            )));
        }

        if !root_dir.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_dir.display()
            )));
        }

        let root_dir = root_dir.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_dir.display(),
                e
            ))
        })?;

        let mut upload_form_name = upload_form_name.into();
        if upload_form_name.trim().is_empty() {
            upload_form_name = DEFAULT_UPLOAD_FORM_NAME.to_owned();
        }

        Ok(Self {
            root_dir,
            web_path: web_path.into(),
            max_file_size,
            namespaces,
            upload_form_name,
            salted_filenames,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn web_path(&self) -> &str {
        &self.web_path
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn upload_form_name(&self) -> &str {
        &self.upload_form_name
    }

    pub fn salted_filenames(&self) -> bool {
        self.salted_filenames
    }

    pub fn is_valid_namespace(&self, ns: &str) -> bool {
        self.namespaces.is_valid(ns)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the storage root from an optional value, defaulting to `vfs_data`.
pub fn root_dir_from_env_value(value: Option<String>) -> PathBuf {
    PathBuf::from(non_blank(value).unwrap_or_else(|| DEFAULT_ROOT_DIR.into()))
}

/// Resolve the public web prefix, defaulting to `/media`.
pub fn web_path_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_WEB_PATH.into())
}

/// Parse the maximum upload size in bytes.
///
/// If `value` is `None` or blank, returns the 32 MiB default.
pub fn max_file_size_from_env_value(value: Option<String>) -> FilesResult<u64> {
    match non_blank(value) {
        None => Ok(DEFAULT_MAX_FILE_SIZE),
        Some(v) => v.parse::<u64>().map_err(|e| {
            FilesError::InvalidConfig(format!("max file size '{}' is not a byte count: {}", v, e))
        }),
    }
}

/// Parse a comma-separated namespace list.
pub fn namespaces_from_env_value(value: Option<String>) -> FilesResult<Namespaces> {
    let value = non_blank(value).unwrap_or_default();
    Namespaces::new(
        value
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty()),
    )
}

/// Parse a boolean toggle. Blank or missing means `false`.
pub fn flag_from_env_value(value: Option<String>) -> FilesResult<bool> {
    match non_blank(value).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some(other) => Err(FilesError::InvalidConfig(format!(
            "expected a boolean flag, got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_new_defaults_form_name() {
        let temp = TempDir::new().unwrap();
        let cfg = VfsConfig::new(
            temp.path(),
            "/media",
            1024,
            Namespaces::default(),
            "",
            false,
        )
        .unwrap();

        assert_eq!(cfg.upload_form_name(), "file");
        assert_eq!(cfg.max_file_size(), 1024);
        assert!(cfg.root_dir().is_absolute());
        assert!(cfg.is_valid_namespace(""));
    }

    #[test]
    fn test_new_root_not_exists() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("missing");

        let cfg = VfsConfig::new(&root, "/", 1, Namespaces::default(), "file", false);

        assert!(matches!(cfg, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_root_not_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let cfg = VfsConfig::new(&root, "/", 1, Namespaces::default(), "file", false);

        assert!(matches!(cfg, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_env_value_parsing() {
        assert_eq!(
            max_file_size_from_env_value(None).unwrap(),
            DEFAULT_MAX_FILE_SIZE
        );
        assert_eq!(
            max_file_size_from_env_value(Some(" 2048 ".into())).unwrap(),
            2048
        );
        assert!(max_file_size_from_env_value(Some("big".into())).is_err());

        let namespaces = namespaces_from_env_value(Some("avatars, docs,,".into())).unwrap();
        assert_eq!(namespaces.as_slice(), ["avatars", "docs"]);
        assert!(namespaces_from_env_value(Some("../x".into())).is_err());

        assert!(!flag_from_env_value(None).unwrap());
        assert!(flag_from_env_value(Some("TRUE".into())).unwrap());
        assert!(flag_from_env_value(Some("maybe".into())).is_err());

        assert_eq!(web_path_from_env_value(Some("  ".into())), "/media");
        assert_eq!(root_dir_from_env_value(None), PathBuf::from("vfs_data"));
    }
}
