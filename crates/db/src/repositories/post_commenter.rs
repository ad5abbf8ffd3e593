//! Post commenter name mapping repository.

use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{post_commenter, PostCommenter};
use hollow_common::{AppError, AppResult};

/// Read access to commenter name mappings.
///
/// Mappings are only created by the name allocator, inside its transaction.
#[derive(Clone)]
pub struct PostCommenterRepository {
    db: Arc<DatabaseConnection>,
}

impl PostCommenterRepository {
    /// Create a new post commenter repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the mapping of a user on a post.
    pub async fn find(
        &self,
        post_id: i32,
        user_id: i32,
    ) -> AppResult<Option<post_commenter::Model>> {
        PostCommenter::find()
            .filter(post_commenter::Column::PostId.eq(post_id))
            .filter(post_commenter::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count mappings of a post.
    pub async fn count_by_post(&self, post_id: i32) -> AppResult<u64> {
        PostCommenter::find()
            .filter(post_commenter::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
