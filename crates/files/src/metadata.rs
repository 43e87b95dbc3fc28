//! Best-effort metadata for a stored file.
//!
//! Three independent probes run against the file:
//!
//! - byte size from the filesystem (mandatory; failure aborts)
//! - pixel dimensions from the image header only (optional)
//! - MIME type sniffed from a bounded prefix (optional)
//!
//! Optional probe failures are logged and dropped, they never fail extraction.

use crate::constants::{FALLBACK_MIME_TYPE, TEXT_MIME_TYPE, TEXT_SNIFF_LEN};
use crate::FilesResult;
use std::io::Read;
use std::path::Path;

/// Pixel dimensions of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Whatever could be learned about a stored file. Only `size_bytes` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub size_bytes: u64,
    pub dimensions: Option<ImageDimensions>,
    pub mime_type: Option<String>,
}

/// Runs all three probes against `path`.
///
/// # Errors
///
/// Returns [`crate::FilesError::Io`] only if the file cannot be stat'ed.
pub fn extract_metadata(path: &Path) -> FilesResult<FileMetadata> {
    let size_bytes = file_size(path)?;

    let dimensions = match image_dimensions(path) {
        Ok(dimensions) => Some(dimensions),
        Err(e) => {
            tracing::warn!("no image dimensions for {}: {}", path.display(), e);
            None
        }
    };

    let mime_type = match sniff_mime_type(path) {
        Ok(mime_type) => Some(mime_type),
        Err(e) => {
            tracing::warn!("mime sniffing failed for {}: {}", path.display(), e);
            None
        }
    };

    Ok(FileMetadata {
        size_bytes,
        dimensions,
        mime_type,
    })
}

pub fn file_size(path: &Path) -> FilesResult<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Decodes only as much of the file as needed to read its dimensions.
pub fn image_dimensions(path: &Path) -> Result<ImageDimensions, image::ImageError> {
    let (width, height) = image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(ImageDimensions { width, height })
}

/// Sniffs the MIME type from the start of the file.
///
/// Magic numbers win. Otherwise a non-empty UTF-8 prefix without binary control
/// bytes is `text/plain; charset=utf-8`, and anything else is
/// `application/octet-stream`.
pub fn sniff_mime_type(path: &Path) -> std::io::Result<String> {
    if let Some(kind) = infer::get_from_path(path)? {
        return Ok(kind.mime_type().to_owned());
    }

    let mut prefix = Vec::with_capacity(TEXT_SNIFF_LEN);
    std::fs::File::open(path)?
        .take(TEXT_SNIFF_LEN as u64)
        .read_to_end(&mut prefix)?;

    Ok(if looks_like_text(&prefix) {
        TEXT_MIME_TYPE
    } else {
        FALLBACK_MIME_TYPE
    }
    .to_owned())
}

fn looks_like_text(prefix: &[u8]) -> bool {
    if prefix.is_empty() {
        return false;
    }
    // A multi-byte character cut by the prefix bound still counts as text.
    let valid = match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    };
    valid
        && prefix
            .iter()
            .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilesError;
    use std::fs;
    use tempfile::TempDir;

    /// A valid 1x1 grayscale PNG.
    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00,
        0x00, 0x3A, 0x7E, 0x9B, 0x55, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78,
        0x9C, 0x63, 0x60, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0x48, 0xAF, 0xA4, 0x71, 0x00,
        0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// The classic 1x1 transparent GIF.
    const GIF_1X1: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xFF,
        0xFF, 0xFF, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00,
        0x3B,
    ];

    #[test]
    fn test_extract_png() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pixel.png");
        fs::write(&path, PNG_1X1).unwrap();

        let metadata = extract_metadata(&path).unwrap();

        assert_eq!(metadata.size_bytes, PNG_1X1.len() as u64);
        assert_eq!(
            metadata.dimensions,
            Some(ImageDimensions {
                width: 1,
                height: 1
            })
        );
        assert_eq!(metadata.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_extract_gif_dimensions() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("anim.gif");
        fs::write(&path, GIF_1X1).unwrap();

        let metadata = extract_metadata(&path).unwrap();

        assert_eq!(metadata.mime_type.as_deref(), Some("image/gif"));
        assert_eq!(
            metadata.dimensions,
            Some(ImageDimensions {
                width: 1,
                height: 1
            })
        );
    }

    #[test]
    fn test_extract_non_image_keeps_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, b"just some text").unwrap();

        let metadata = extract_metadata(&path).unwrap();

        assert_eq!(metadata.size_bytes, 14);
        assert_eq!(metadata.dimensions, None);
        assert_eq!(metadata.mime_type.as_deref(), Some(TEXT_MIME_TYPE));
    }

    #[test]
    fn test_sniff_text_and_binary() {
        let temp = TempDir::new().unwrap();

        let utf8 = temp.path().join("greeting.txt");
        fs::write(&utf8, "héllo wörld\r\n\tindented\n").unwrap();
        assert_eq!(sniff_mime_type(&utf8).unwrap(), TEXT_MIME_TYPE);

        let binary = temp.path().join("blob.bin");
        fs::write(&binary, [0x00, 0x01, 0x02, 0xFE, 0xFF]).unwrap();
        assert_eq!(sniff_mime_type(&binary).unwrap(), FALLBACK_MIME_TYPE);

        let empty = temp.path().join("empty");
        fs::write(&empty, b"").unwrap();
        assert_eq!(sniff_mime_type(&empty).unwrap(), FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_text_prefix_may_split_a_character() {
        let mut prefix = "a".repeat(TEXT_SNIFF_LEN - 1).into_bytes();
        prefix.push(0xC3);
        assert!(looks_like_text(&prefix));

        assert!(!looks_like_text(&[b'a', 0xC3, b'b']));
        assert!(!looks_like_text(b"nul\0inside"));
    }

    #[test]
    fn test_extract_truncated_png_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.png");
        fs::write(&path, &PNG_1X1[..8]).unwrap();

        let metadata = extract_metadata(&path).unwrap();

        assert_eq!(metadata.size_bytes, 8);
        assert_eq!(metadata.dimensions, None);
        assert_eq!(metadata.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_extract_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = extract_metadata(&temp.path().join("missing"));

        assert!(matches!(result, Err(FilesError::Io(_))));
    }
}
