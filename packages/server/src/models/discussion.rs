use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{discussion, file_attachment, user};
use crate::error::AppError;

use super::attachment::AttachmentView;
use super::shared::{FieldErrors, Pagination, char_len_between};
use super::user::UserView;

pub const CONTENT_MIN_CHARS: usize = 10;
pub const CONTENT_MAX_CHARS: usize = 5000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateDiscussionRequest {
    /// Post body, 10-5000 characters.
    #[schema(example = "Has anyone benchmarked the new allocator?")]
    pub content: Option<String>,
    /// Previously uploaded, still unbound attachment to bind to this post.
    #[schema(example = 7)]
    pub attachment_id: Option<i64>,
}

/// Check the content bounds and return the validated content.
pub fn validate_create_discussion_request(
    payload: &CreateDiscussionRequest,
) -> Result<&str, AppError> {
    let mut errors = FieldErrors::default();
    match payload.content.as_deref() {
        None => errors.add("content", "Content cannot be null"),
        Some(c) if !char_len_between(c, CONTENT_MIN_CHARS, CONTENT_MAX_CHARS) => errors.add(
            "content",
            format!("Content must be {CONTENT_MIN_CHARS}-{CONTENT_MAX_CHARS} characters"),
        ),
        _ => {}
    }
    errors.into_result()?;
    Ok(payload.content.as_deref().unwrap_or_default())
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DiscussionView {
    #[schema(example = 12)]
    pub id: i64,
    pub content: String,
    /// Creation time, set by the server.
    pub created_at: DateTime<Utc>,
    pub user: UserView,
    pub attachment: Option<AttachmentView>,
}

impl DiscussionView {
    pub fn new(
        model: discussion::Model,
        author: user::Model,
        attachment: Option<file_attachment::Model>,
    ) -> Self {
        Self {
            id: model.id,
            content: model.content,
            created_at: model.created_at,
            user: UserView::from(author),
            attachment: attachment.map(AttachmentView::from),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DiscussionListResponse {
    pub data: Vec<DiscussionView>,
    pub pagination: Pagination,
}
