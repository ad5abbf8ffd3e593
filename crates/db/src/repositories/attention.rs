//! Attention repository.

use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{attention, Attention};
use hollow_common::{AppError, AppResult};

/// Attention repository for database operations.
#[derive(Clone)]
pub struct AttentionRepository {
    db: Arc<DatabaseConnection>,
}

impl AttentionRepository {
    /// Create a new attention repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// IDs of users following a post.
    pub async fn find_user_ids_by_post(&self, post_id: i32) -> AppResult<Vec<i32>> {
        let rows = Attention::find()
            .filter(attention::Column::PostId.eq(post_id))
            .order_by_asc(attention::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|row| row.user_id).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_user_ids_by_post() {
        let rows = [3, 8].map(|user_id| attention::Model {
            id: user_id,
            user_id,
            post_id: 1,
            created_at: Utc::now().into(),
        });

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = AttentionRepository::new(db);
        assert_eq!(repo.find_user_ids_by_post(1).await.unwrap(), vec![3, 8]);
    }
}
