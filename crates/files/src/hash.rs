//! Content hashes and the sharded address derived from them.
//!
//! A [`ContentHash`] is the canonical representation of a file's MD5 digest:
//! **32 lowercase hexadecimal characters**. Once constructed it is guaranteed to be
//! canonical, so the address derivation below never fails.
//!
//! ## Sharded layout
//! For a hash `h`, content lives at:
//! `<h[0]>/<h[1..3]>/<h>.jpg`
//!
//! Example:
//! `d/41/d41d8cd98f00b204e9800998ecf8427e.jpg`
//!
//! The first level has at most 16 buckets and the second at most 256, which keeps
//! any single directory small as the store grows.

use crate::constants::DEFAULT_HASH_EXTENSION;
use std::fmt;

/// Canonical content hash (32 lowercase hex characters).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Builds a hash from a finished MD5 digest.
    pub fn from_digest(digest: &[u8; 16]) -> Self {
        Self(hex::encode(digest))
    }

    /// Wraps known-good hex in tests that need a fixed address.
    #[cfg(test)]
    pub(crate) fn from_hex(hex: &str) -> Self {
        assert!(
            hex.len() == 32 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')),
            "not a canonical hash: {}",
            hex
        );
        Self(hex.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory: `<h[0]>/<h[1..3]>`.
    pub fn shard_dir(&self) -> String {
        format!("{}/{}", &self.0[0..1], &self.0[1..3])
    }

    /// Storage path relative to a namespace: `<shard_dir>/<h>.<ext>`.
    pub fn storage_path(&self) -> String {
        format!("{}/{}.{}", self.shard_dir(), self.0, DEFAULT_HASH_EXTENSION)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md5::{Digest, Md5};

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    #[test]
    fn test_from_digest_matches_known_md5() {
        let digest: [u8; 16] = Md5::digest(b"").into();
        let hash = ContentHash::from_digest(&digest);
        assert_eq!(hash.as_str(), EMPTY_MD5);
    }

    #[test]
    fn test_shard_dir_and_storage_path() {
        let hash = ContentHash::from_hex(EMPTY_MD5);

        assert_eq!(hash.shard_dir(), "d/41");
        assert_eq!(
            hash.storage_path(),
            "d/41/d41d8cd98f00b204e9800998ecf8427e.jpg"
        );
    }

    #[test]
    fn test_storage_path_composes_shard_dir() {
        for input in [
            EMPTY_MD5,
            "0123456789abcdef0123456789abcdef",
            "ffffffffffffffffffffffffffffffff",
        ] {
            let hash = ContentHash::from_hex(input);
            assert_eq!(
                hash.shard_dir(),
                format!("{}/{}", &input[0..1], &input[1..3])
            );
            assert_eq!(
                hash.storage_path(),
                format!("{}/{}.{}", hash.shard_dir(), input, DEFAULT_HASH_EXTENSION)
            );
        }
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        let digest: [u8; 16] = Md5::digest(b"Hello, World!").into();
        let hash = ContentHash::from_digest(&digest);

        assert_eq!(hash.as_str(), "65a8e27d8879283831b664bd8b7f0ad4");
        assert_eq!(hash.to_string(), hash.as_str());
    }
}
