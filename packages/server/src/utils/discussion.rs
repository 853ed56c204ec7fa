use sea_orm::{ConnectionTrait, DbErr, EntityTrait};

use crate::entity::discussion;

/// Whether `user_id` may delete discussion `discussion_id`.
///
/// Only the author may. A missing discussion yields `false` so callers
/// cannot tell absence from foreign ownership. Read-only.
pub async fn is_allowed_to_delete<C: ConnectionTrait>(
    db: &C,
    discussion_id: i64,
    user_id: i64,
) -> Result<bool, DbErr> {
    let discussion = discussion::Entity::find_by_id(discussion_id).one(db).await?;
    Ok(discussion.is_some_and(|d| d.user_id == user_id))
}
