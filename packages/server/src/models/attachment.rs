use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::file_attachment;

/// Response DTO for a single attachment.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttachmentView {
    #[schema(example = 7)]
    pub id: i64,
    /// Upload time.
    pub created_at: DateTime<Utc>,
    /// Generated stored name, served under `/api/v1/images/attachments/{name}`.
    #[schema(example = "3f2b9c0d4e5a46f7a8b9c0d1e2f3a4b5")]
    pub name: String,
    /// MIME type detected from the file content.
    #[schema(example = "image/png")]
    pub file_type: String,
}

impl From<file_attachment::Model> for AttachmentView {
    fn from(model: file_attachment::Model) -> Self {
        Self {
            id: model.id,
            created_at: model.created_at,
            name: model.name,
            file_type: model.file_type,
        }
    }
}
