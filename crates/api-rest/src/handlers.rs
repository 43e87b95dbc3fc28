//! Route handlers.

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use tokio::io::AsyncRead;
use vfs_files::{SpooledUpload, UploadError, UploadSource};

use crate::health::{HealthRes, HealthService};
use crate::request::{
    body_reader, declared_length, field_reader, malformed, parse_folder_id, UploadParams,
    FOLDER_ID_FIELD, NS_FIELD,
};
use crate::response::{UploadReply, UploadResponse};
use crate::AppState;

/// Which pipeline a request feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Hash,
    Folder,
}

impl Target {
    fn folder_id(self, raw: Option<&str>) -> Result<Option<i64>, UploadError> {
        match self {
            Target::Hash => Ok(None),
            Target::Folder => parse_folder_id(raw).map(Some),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness probe for load balancers and monitoring.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    put,
    path = "/upload/hash",
    params(UploadParams),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File published under its content hash", body = UploadResponse),
        (status = 400, description = "Invalid namespace", body = UploadResponse),
        (status = 413, description = "Payload too large", body = UploadResponse),
        (status = 500, description = "Internal server error", body = UploadResponse)
    )
)]
/// Publishes the raw request body under its content hash.
#[axum::debug_handler]
pub async fn put_hash_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Body,
) -> UploadReply {
    UploadReply(stream_upload(&state, params, &headers, body, Target::Hash).await)
}

#[utoipa::path(
    post,
    path = "/upload/hash",
    params(UploadParams),
    request_body(content = String, content_type = "multipart/form-data",
        description = "File part plus an optional `ns` text field, in any order"),
    responses(
        (status = 200, description = "File published under its content hash", body = UploadResponse),
        (status = 400, description = "Invalid namespace or malformed form", body = UploadResponse),
        (status = 413, description = "Payload too large", body = UploadResponse),
        (status = 500, description = "Internal server error", body = UploadResponse)
    )
)]
/// Publishes the file part of a multipart form under its content hash.
///
/// The file part is spooled to disk so form values after it still apply.
#[axum::debug_handler]
pub async fn post_hash_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadReply {
    UploadReply(form_upload(&state, params, multipart, Target::Hash).await)
}

#[utoipa::path(
    put,
    path = "/upload/file",
    params(UploadParams),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File stored and recorded", body = UploadResponse),
        (status = 400, description = "Missing or invalid folderId", body = UploadResponse),
        (status = 404, description = "Folder not found", body = UploadResponse),
        (status = 413, description = "Payload too large", body = UploadResponse),
        (status = 500, description = "Internal server error", body = UploadResponse)
    )
)]
/// Stores the raw request body as a new file of `folderId`.
#[axum::debug_handler]
pub async fn put_file_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Body,
) -> UploadReply {
    UploadReply(stream_upload(&state, params, &headers, body, Target::Folder).await)
}

#[utoipa::path(
    post,
    path = "/upload/file",
    params(UploadParams),
    request_body(content = String, content_type = "multipart/form-data",
        description = "File part plus `folderId` and optional `ns` text fields, in any order"),
    responses(
        (status = 200, description = "File stored and recorded", body = UploadResponse),
        (status = 400, description = "Missing or invalid folderId, or malformed form", body = UploadResponse),
        (status = 404, description = "Folder not found", body = UploadResponse),
        (status = 413, description = "Payload too large", body = UploadResponse),
        (status = 500, description = "Internal server error", body = UploadResponse)
    )
)]
/// Stores the file part of a multipart form as a new file of `folderId`.
///
/// The response carries the assigned id plus the base name and extension of the
/// uploaded filename.
#[axum::debug_handler]
pub async fn post_file_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadReply {
    UploadReply(form_upload(&state, params, multipart, Target::Folder).await)
}

async fn stream_upload(
    state: &AppState,
    params: UploadParams,
    headers: &HeaderMap,
    body: Body,
    target: Target,
) -> Result<UploadResponse, UploadError> {
    let folder_id = target.folder_id(params.folder_id.as_deref())?;
    let source =
        UploadSource::new(body_reader(body)).with_declared_size(declared_length(headers));
    dispatch(state, source, &params.ns, folder_id).await
}

async fn form_upload(
    state: &AppState,
    params: UploadParams,
    multipart: Result<Multipart, MultipartRejection>,
    target: Target,
) -> Result<UploadResponse, UploadError> {
    let mut multipart = multipart.map_err(malformed)?;
    let UploadParams {
        mut ns,
        mut folder_id,
    } = params;
    let form_name = state.uploads.store().config().upload_form_name();
    let mut upload: Option<(SpooledUpload, Option<String>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_owned();

        if name == form_name {
            if upload.is_some() {
                tracing::debug!("ignoring repeated '{}' part", form_name);
                continue;
            }
            let filename = field.file_name().map(str::to_owned);
            let spooled = state.uploads.spool(field_reader(field)).await?;
            upload = Some((spooled, filename));
            continue;
        }

        match name.as_str() {
            NS_FIELD => ns = field.text().await.map_err(malformed)?,
            FOLDER_ID_FIELD => folder_id = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    let (spooled, filename) = upload.ok_or_else(|| {
        UploadError::Validation(format!("missing form field '{}'", form_name))
    })?;
    let folder_id = target.folder_id(folder_id.as_deref())?;
    let source = UploadSource::new(spooled.open()?)
        .with_declared_size(Some(spooled.len()))
        .with_original_filename(filename);
    dispatch(state, source, &ns, folder_id).await
}

async fn dispatch<R>(
    state: &AppState,
    source: UploadSource<R>,
    ns: &str,
    folder_id: Option<i64>,
) -> Result<UploadResponse, UploadError>
where
    R: AsyncRead + Unpin,
{
    match folder_id {
        None => state.uploads.hash_upload(source, ns).await.map(Into::into),
        Some(id) => state
            .uploads
            .folder_upload(source, ns, id)
            .await
            .map(Into::into),
    }
}
