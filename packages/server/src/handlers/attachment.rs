use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::attachment::AttachmentService;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::attachment::AttachmentView;
use crate::state::AppState;

/// Room for multipart framing around the largest accepted file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn attachment_upload_body_limit(max_attachment_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max((max_attachment_size + MULTIPART_OVERHEAD) as usize)
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Attachments",
    operation_id = "uploadAttachment",
    summary = "Upload an image attachment",
    description = "Stores the `file` multipart field as an unbound attachment. The content must \
        be PNG, JPEG or GIF; the type is detected from the bytes, not the filename. Bind the \
        returned id by passing it as `attachment_id` when creating a discussion. Attachments \
        never bound are eventually removed.",
    request_body(content_type = "multipart/form-data", description = "Image file in the `file` field"),
    responses(
        (status = 201, description = "Attachment stored", body = AttachmentView),
        (status = 400, description = "Missing file or too large (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not authenticated (TOKEN_MISSING, TOKEN_INVALID, INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 415, description = "Not an accepted image type (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("basic" = []), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_attachment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(|s| s.to_string());
        let bytes = read_limited(field, state.config.storage.max_attachment_size).await?;
        upload = Some((file_name, bytes));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    let attachment = AttachmentService::new(&state.db, &*state.attachments)
        .upload(&*state.detector, &bytes, file_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(AttachmentView::from(attachment))))
}

/// Buffer a multipart field, failing as soon as it exceeds `max_size`.
async fn read_limited(mut field: Field<'_>, max_size: u64) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (buf.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::Validation(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
