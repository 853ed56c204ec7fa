use chrono::Utc;
use common::{ATTACHMENT_IMAGE_TYPES, BlobName, BlobStore, TypeDetector};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::{info, warn};

use crate::entity::{discussion, file_attachment};
use crate::error::AppError;

pub struct AttachmentService<'a, C: ConnectionTrait> {
    conn: &'a C,
    store: &'a dyn BlobStore,
}

impl<'a, C: ConnectionTrait> AttachmentService<'a, C> {
    pub fn new(conn: &'a C, store: &'a dyn BlobStore) -> Self {
        Self { conn, store }
    }

    /// Store an uploaded image under a generated name and record it unbound.
    ///
    /// The declared client filename is only logged; the stored name is
    /// always freshly generated.
    pub async fn upload(
        &self,
        detector: &dyn TypeDetector,
        bytes: &[u8],
        declared_name: Option<&str>,
    ) -> Result<file_attachment::Model, AppError> {
        let file_type = detector
            .detect_allowed(bytes, ATTACHMENT_IMAGE_TYPES)
            .map_err(|detected| AppError::UnsupportedMediaType(detected.to_string()))?;

        let name = BlobName::generate();
        let size = self.store.write(&name, bytes).await?;

        let record = file_attachment::ActiveModel {
            name: Set(name.to_string()),
            file_type: Set(file_type.to_string()),
            discussion_id: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match record.insert(self.conn).await {
            Ok(model) => {
                info!(
                    attachment_id = model.id,
                    name = %name,
                    file_type,
                    size,
                    declared_name,
                    "Stored attachment"
                );
                Ok(model)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&name).await {
                    warn!(name = %name, error = %cleanup, "Failed to remove blob of unrecorded upload");
                }
                Err(e.into())
            }
        }
    }

    /// Set the attachment's discussion reference. Succeeds at most once per attachment.
    ///
    /// Must run on the same transaction that inserted `discussion`.
    pub async fn bind_to_discussion(
        &self,
        attachment_id: i64,
        discussion: &discussion::Model,
    ) -> Result<(), AppError> {
        let attachment = file_attachment::Entity::find_by_id(attachment_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Attachment not found".into()))?;

        if attachment.discussion_id.is_some() {
            return Err(already_bound());
        }

        let result = file_attachment::Entity::update_many()
            .col_expr(
                file_attachment::Column::DiscussionId,
                Expr::value(Some(discussion.id)),
            )
            .filter(file_attachment::Column::Id.eq(attachment_id))
            .filter(file_attachment::Column::DiscussionId.is_null())
            .exec(self.conn)
            .await?;

        // Lost a race with a concurrent bind.
        if result.rows_affected == 0 {
            return Err(already_bound());
        }

        Ok(())
    }

    /// Remove the attachment bound to `discussion_id`, blob first, then record.
    ///
    /// Returns whether an attachment was bound. A blob that is already gone is
    /// not an error, so a retried delete converges.
    pub async fn delete_bound_attachment(&self, discussion_id: i64) -> Result<bool, AppError> {
        let Some(attachment) = file_attachment::Entity::find()
            .filter(file_attachment::Column::DiscussionId.eq(discussion_id))
            .one(self.conn)
            .await?
        else {
            return Ok(false);
        };

        let name = BlobName::parse(&attachment.name).map_err(|e| {
            AppError::Internal(format!("attachment {} has bad name: {e}", attachment.id))
        })?;
        if !self.store.delete(&name).await? {
            warn!(
                attachment_id = attachment.id,
                name = %name,
                "Blob already missing, removing record"
            );
        }

        file_attachment::Entity::delete_by_id(attachment.id)
            .exec(self.conn)
            .await
            .map_err(|e| {
                AppError::StorageInconsistency(format!(
                    "blob {} deleted but record {} remains: {e}",
                    attachment.name, attachment.id
                ))
            })?;

        Ok(true)
    }
}

fn already_bound() -> AppError {
    AppError::Conflict("Attachment is already bound to a discussion".into())
}
