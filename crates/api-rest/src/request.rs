//! Request classification.
//!
//! A `PUT` carries the file as its raw body with the size in `Content-Length`. A
//! `POST` is a multipart form: text fields `ns` and `folderId` override the query
//! string wherever they appear, so the file part is spooled to a temp file in the
//! storage root until the whole form has been read.

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::http::{header, HeaderMap};
use futures::TryStreamExt;
use serde::Deserialize;
use std::io;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use utoipa::IntoParams;
use vfs_files::UploadError;

pub(crate) const NS_FIELD: &str = "ns";
pub(crate) const FOLDER_ID_FIELD: &str = "folderId";

/// Upload target given in the query string.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadParams {
    /// Storage namespace; empty for public
    #[serde(default)]
    pub ns: String,
    /// Folder receiving the file (foldered uploads only)
    #[serde(rename = "folderId")]
    pub folder_id: Option<String>,
}

/// Upload body as the storage layer consumes it.
pub(crate) type BodyReader<'a> = Pin<Box<dyn AsyncRead + Send + 'a>>;

/// Size announced by the client; trusted as is.
pub(crate) fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

pub(crate) fn body_reader(body: Body) -> BodyReader<'static> {
    Box::pin(StreamReader::new(
        body.into_data_stream().map_err(io::Error::other),
    ))
}

pub(crate) fn field_reader(field: Field<'_>) -> BodyReader<'_> {
    Box::pin(StreamReader::new(field.map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, e.to_string())
    })))
}

/// Parses the required `folderId` value.
pub(crate) fn parse_folder_id(raw: Option<&str>) -> Result<i64, UploadError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| UploadError::Validation(format!("missing '{}'", FOLDER_ID_FIELD)))?;
    raw.parse().map_err(|_| {
        UploadError::Validation(format!("invalid '{}': '{}'", FOLDER_ID_FIELD, raw))
    })
}

pub(crate) fn malformed(err: impl std::fmt::Display) -> UploadError {
    UploadError::Validation(format!("malformed multipart body: {}", err))
}
