use chrono::Utc;
use sea_orm::sea_query::{
    Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder, SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{discussion, file_attachment, user};
use crate::utils::hash;

/// Number of demo accounts created by [`seed_dev_users`].
pub const DEV_USER_COUNT: usize = 15;
/// Password shared by all demo accounts.
pub const DEV_USER_PASSWORD: &str = "P4ssword";

/// Create `user1`..`user15` for local development. Existing usernames are left alone.
pub async fn seed_dev_users(db: &DatabaseConnection) -> Result<(), DbErr> {
    let password = hash::hash_password(DEV_USER_PASSWORD)
        .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;

    let mut inserted = 0u32;
    for i in 1..=DEV_USER_COUNT {
        let model = user::ActiveModel {
            username: Set(format!("user{i}")),
            display_name: Set(format!("display{i}")),
            password: Set(password.clone()),
            image: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = user::Entity::insert(model)
            .on_conflict(
                OnConflict::column(user::Column::Username)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} development users", inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// Schema-sync only creates the unique indexes declared on the entities;
/// composite lookup indexes are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Author-scoped feeds:
    // SELECT ... FROM discussion WHERE user_id = ? AND id < ? ORDER BY id DESC
    let author_feed = Index::create()
        .if_not_exists()
        .name("idx_discussion_user_id")
        .table(discussion::Entity)
        .col(discussion::Column::UserId)
        .col(discussion::Column::Id)
        .to_owned();
    create_index(db, "idx_discussion_user_id", &author_feed).await;

    // Orphan sweep:
    // SELECT id FROM file_attachment WHERE discussion_id IS NULL AND created_at < ?
    let orphans = Index::create()
        .if_not_exists()
        .name("idx_file_attachment_orphans")
        .table(file_attachment::Entity)
        .col(file_attachment::Column::DiscussionId)
        .col(file_attachment::Column::CreatedAt)
        .to_owned();
    create_index(db, "idx_file_attachment_orphans", &orphans).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
