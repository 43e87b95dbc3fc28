//! Namespace allow-list and relative path validation.
//!
//! A namespace is the first directory level under the storage root. The public
//! namespace (empty string) is always valid; any other must be configured.

use crate::constants::NAMESPACE_PUBLIC;
use crate::{FilesError, FilesResult};
use std::path::{Component, Path};

/// The configured set of non-public namespaces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Namespaces(Vec<String>);

impl Namespaces {
    /// Creates an allow-list, rejecting entries that are not a single safe path segment.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] for an entry containing separators or `..`.
    pub fn new<I, S>(namespaces: I) -> FilesResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Vec::new();
        for ns in namespaces {
            let ns = ns.into();
            if ns == NAMESPACE_PUBLIC {
                continue;
            }
            validate_namespace_segment(&ns)?;
            if !list.contains(&ns) {
                list.push(ns);
            }
        }
        Ok(Self(list))
    }

    /// Returns true if `ns` is public or in the allow-list.
    pub fn is_valid(&self, ns: &str) -> bool {
        ns == NAMESPACE_PUBLIC || self.0.iter().any(|n| n == ns)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Checks that a namespace is empty or exactly one normal path segment.
///
/// This is a traversal check only; it does not consult any allow-list.
pub fn validate_namespace_segment(ns: &str) -> FilesResult<()> {
    if ns == NAMESPACE_PUBLIC {
        return Ok(());
    }
    let mut components = Path::new(ns).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !ns.contains(|c: char| c == '/' || c == '\\') => Ok(()),
        _ => Err(FilesError::InvalidPath(format!("invalid namespace '{}'", ns))),
    }
}

/// Checks that a relative path stays below the directory it is joined onto.
pub fn validate_relative_path(rel: &str) -> FilesResult<()> {
    if rel.is_empty() {
        return Err(FilesError::InvalidPath("empty relative path".into()));
    }
    let safe = Path::new(rel)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || rel.contains('\\') {
        return Err(FilesError::InvalidPath(format!(
            "relative path escapes storage root: '{}'",
            rel
        )));
    }
    Ok(())
}
