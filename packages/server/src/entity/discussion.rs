use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discussion")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub user_id: i64,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// The attachment side owns the foreign key; see `file_attachment::Model::discussion_id`.
    #[sea_orm(has_one)]
    pub attachment: HasOne<super::file_attachment::Entity>,

    /// Set once at creation.
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
