use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_attachment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Generated blob name; unrelated to the client's filename.
    #[sea_orm(unique)]
    pub name: String,

    /// MIME type detected from the uploaded bytes.
    pub file_type: String,

    /// NULL until the attachment is bound. Written at most once.
    #[sea_orm(unique)]
    pub discussion_id: Option<i64>,
    #[sea_orm(belongs_to, from = "discussion_id", to = "id")]
    pub discussion: HasOne<super::discussion::Entity>,

    /// Upload time; drives orphan reclamation.
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
