//! Push message entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A notification that passed the recipient's preference filter.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "push_message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Recipient
    #[sea_orm(indexed)]
    pub user_id: i32,

    pub post_id: i32,

    pub comment_id: i32,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// Notification kind bitmask
    pub kind: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
