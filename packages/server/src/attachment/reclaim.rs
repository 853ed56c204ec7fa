use chrono::Utc;
use common::{BlobName, BlobStore};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect,
    TransactionTrait,
};
use tracing::{error, info, warn};

use crate::config::ReclaimConfig;
use crate::entity::file_attachment;

/// Outcome of one reclamation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimReport {
    pub removed: usize,
    pub failed: usize,
}

/// Run the orphan reclaimer as a background task.
pub async fn run_reclaimer(
    db: DatabaseConnection,
    store: std::sync::Arc<dyn BlobStore>,
    config: ReclaimConfig,
) {
    let retention = config.retention();

    info!(
        interval_secs = config.interval_secs,
        retention_secs = config.retention_secs,
        "Starting orphan attachment reclaimer"
    );

    let mut interval = tokio::time::interval(config.interval());

    loop {
        interval.tick().await;

        match reclaim_orphans(&db, &*store, retention).await {
            Ok(report) if report.removed > 0 || report.failed > 0 => {
                info!(
                    removed = report.removed,
                    failed = report.failed,
                    "Reclaimed orphan attachments"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Orphan reclamation failed"),
        }
    }
}

/// Remove unbound attachments uploaded strictly before `now - retention`.
///
/// Each orphan is handled on its own transaction; a failure is logged and
/// counted without stopping the rest of the batch.
pub async fn reclaim_orphans(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    retention: chrono::Duration,
) -> Result<ReclaimReport, DbErr> {
    let cutoff = Utc::now() - retention;

    let orphan_ids: Vec<i64> = file_attachment::Entity::find()
        .select_only()
        .column(file_attachment::Column::Id)
        .filter(file_attachment::Column::DiscussionId.is_null())
        .filter(file_attachment::Column::CreatedAt.lt(cutoff))
        .into_tuple()
        .all(db)
        .await?;

    let mut report = ReclaimReport::default();

    for attachment_id in orphan_ids {
        match reclaim_one(db, store, attachment_id).await {
            Ok(true) => report.removed += 1,
            Ok(false) => {}
            Err(e) => {
                report.failed += 1;
                error!(attachment_id, error = %e, "Failed to reclaim orphan attachment");
            }
        }
    }

    Ok(report)
}

/// Returns `false` when the attachment was bound or removed since the scan.
async fn reclaim_one(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    attachment_id: i64,
) -> anyhow::Result<bool> {
    let txn = db.begin().await?;

    let attachment = file_attachment::Entity::find_by_id(attachment_id)
        .filter(file_attachment::Column::DiscussionId.is_null())
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let Some(attachment) = attachment else {
        txn.rollback().await?;
        return Ok(false);
    };

    let name = BlobName::parse(&attachment.name)?;
    if !store.delete(&name).await? {
        warn!(attachment_id, name = %name, "Orphan blob already missing, removing record");
    }

    file_attachment::Entity::delete_by_id(attachment_id)
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(true)
}
