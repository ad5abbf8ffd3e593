//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Author user ID
    #[sea_orm(indexed)]
    pub user_id: i32,

    /// Post text
    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Content tag (e.g. a sensitivity label)
    #[sea_orm(nullable)]
    pub tag: Option<String>,

    /// Like count (denormalized)
    #[sea_orm(default_value = 0)]
    pub like_num: i32,

    /// Reply count (denormalized)
    #[sea_orm(default_value = 0)]
    pub reply_num: i32,

    /// Report count (denormalized)
    #[sea_orm(default_value = 0)]
    pub report_num: i32,

    /// Number of distinct non-author commenters, equal to the number of
    /// `post_commenter` rows for this post.
    #[sea_orm(default_value = 0)]
    pub distinct_commenter_count: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Soft deletion marker
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the post has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::post_commenter::Entity")]
    Commenters,
    #[sea_orm(has_many = "super::attention::Entity")]
    Attentions,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::post_commenter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commenters.def()
    }
}

impl Related<super::attention::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attentions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
