use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::{BlobName, BlobStore, OCTET_STREAM};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::file_attachment;
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/attachments/{name}",
    tag = "Images",
    operation_id = "getAttachmentImage",
    summary = "Download an attachment image",
    description = "Streams the stored bytes. Stored names are never reused, so the name doubles \
        as the ETag and `If-None-Match` is honoured.",
    params(("name" = String, Path, description = "Stored attachment name")),
    responses(
        (status = 200, description = "Image content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "No such image (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn get_attachment_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let name = BlobName::parse(&name).map_err(|_| image_not_found())?;

    let attachment = file_attachment::Entity::find()
        .filter(file_attachment::Column::Name.eq(name.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(image_not_found)?;

    stream_blob(&*state.attachments, &name, &attachment.file_type, &headers).await
}

#[utoipa::path(
    get,
    path = "/profile/{name}",
    tag = "Images",
    operation_id = "getProfileImage",
    summary = "Download a profile image",
    params(("name" = String, Path, description = "Stored profile image name")),
    responses(
        (status = 200, description = "Image content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "No such image (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn get_profile_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let name = BlobName::parse(&name).map_err(|_| image_not_found())?;
    if let Some(not_modified) = not_modified(&name, &headers) {
        return Ok(not_modified);
    }

    let bytes = state
        .profile_images
        .read(&name)
        .await
        .map_err(|_| image_not_found())?;
    let content_type = state.detector.detect(&bytes);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len().to_string())
        .header(header::ETAG, etag(&name))
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

const CACHE_CONTROL: &str = "public, max-age=86400";

fn image_not_found() -> AppError {
    AppError::NotFound("Image not found".into())
}

fn etag(name: &BlobName) -> String {
    format!("\"{name}\"")
}

fn not_modified(name: &BlobName, headers: &HeaderMap) -> Option<Response> {
    let expected = etag(name);
    match headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        Some(val) if val == expected || val == "*" => Some(StatusCode::NOT_MODIFIED.into_response()),
        _ => None,
    }
}

async fn stream_blob(
    store: &dyn BlobStore,
    name: &BlobName,
    content_type: &str,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    if let Some(not_modified) = not_modified(name, headers) {
        return Ok(not_modified);
    }

    let size = store.size(name).await.map_err(|_| image_not_found())?;
    let reader = store.read_stream(name).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = if content_type.is_empty() {
        OCTET_STREAM
    } else {
        content_type
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::ETAG, etag(name))
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
