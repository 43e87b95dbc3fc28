//! JSON bodies and status mapping for upload endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use vfs_files::{FilesError, FolderUpload, HashUpload, UploadError};

/// Body returned by both upload endpoints. Absent fields are omitted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Content hash (hash uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Public path of the published file (hash uploads)
    #[serde(rename = "webPath", skip_serializing_if = "Option::is_none")]
    pub web_path: Option<String>,
    /// Assigned file id (foldered uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Original file extension (foldered uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    /// Original file base name (foldered uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl From<HashUpload> for UploadResponse {
    fn from(upload: HashUpload) -> Self {
        Self {
            hash: Some(upload.hash.to_string()),
            web_path: Some(upload.web_path),
            ..Self::default()
        }
    }
}

impl From<FolderUpload> for UploadResponse {
    fn from(upload: FolderUpload) -> Self {
        Self {
            id: Some(upload.file.id),
            ext: non_empty(upload.ext),
            name: non_empty(upload.name),
            ..Self::default()
        }
    }
}

/// HTTP status for a failed upload.
pub fn status_for(err: &UploadError) -> StatusCode {
    match err {
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Validation(_) => StatusCode::BAD_REQUEST,
        UploadError::FolderNotFound(_) => StatusCode::NOT_FOUND,
        UploadError::FolderLookup(_) | UploadError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        UploadError::Files(e) => match e {
            FilesError::InvalidNamespace(_) | FilesError::InvalidPath(_) => {
                StatusCode::BAD_REQUEST
            }
            FilesError::InvalidRootDirectory(_)
            | FilesError::InvalidConfig(_)
            | FilesError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

/// Outcome of one upload request, rendered as status plus JSON body.
#[derive(Debug)]
pub struct UploadReply(pub Result<UploadResponse, UploadError>);

impl IntoResponse for UploadReply {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!("Upload error: {:?}", err);
                } else {
                    tracing::warn!("Upload rejected: {}", err);
                }
                let body = UploadResponse {
                    error: Some(err.to_string()),
                    ..UploadResponse::default()
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfs_files::RepositoryError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&UploadError::TooLarge { max: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&UploadError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&UploadError::FolderNotFound(4)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&UploadError::FolderLookup(RepositoryError::Backend("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&UploadError::Files(FilesError::InvalidNamespace("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&UploadError::Files(FilesError::Io(std::io::Error::other(
                "disk full"
            )))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let json = serde_json::to_value(UploadResponse {
            hash: Some("abc".into()),
            web_path: Some("/media/a/bc/abc.jpg".into()),
            ..UploadResponse::default()
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({"hash": "abc", "webPath": "/media/a/bc/abc.jpg"})
        );
    }
}
