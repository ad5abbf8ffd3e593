//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A comment on a post.
///
/// Serializable because comment lists are cached as JSON in the fast store.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub post_id: i32,

    /// Commenter user ID
    pub user_id: i32,

    /// Comment this one replies to, within the same post
    #[sea_orm(nullable)]
    pub reply_to: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Pseudonymous display name, assigned per post
    pub name: String,

    #[sea_orm(nullable)]
    pub tag: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id"
    )]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
