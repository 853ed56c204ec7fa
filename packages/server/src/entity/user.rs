use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub username: String,
    pub display_name: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password: String,
    /// Stored name of the profile image, if one was uploaded.
    pub image: Option<String>,

    #[sea_orm(has_many)]
    pub discussions: HasMany<super::discussion::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
