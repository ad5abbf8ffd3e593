//! Comment repository.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::entities::{comment, Comment};
use hollow_common::{AppError, AppResult};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All comments of a post in ID order, soft-deleted ones included.
    ///
    /// Readers decide how to render deleted comments.
    pub async fn find_by_post(&self, post_id: i32) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments of several posts in one query, grouped by post.
    ///
    /// Every requested post has an entry; posts without comments map to an
    /// empty list.
    pub async fn find_by_posts(
        &self,
        post_ids: &[i32],
    ) -> AppResult<HashMap<i32, Vec<comment::Model>>> {
        let mut grouped: HashMap<i32, Vec<comment::Model>> =
            post_ids.iter().map(|id| (*id, Vec::new())).collect();
        if post_ids.is_empty() {
            return Ok(grouped);
        }

        let comments = Comment::find()
            .filter(comment::Column::PostId.is_in(post_ids.iter().copied()))
            .order_by_asc(comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for comment in comments {
            grouped.entry(comment.post_id).or_default().push(comment);
        }

        Ok(grouped)
    }

    /// Find a comment that belongs to the given post.
    pub async fn find_in_post(
        &self,
        post_id: i32,
        comment_id: i32,
    ) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(comment_id)
            .filter(comment::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a comment as deleted. Returns whether a live comment was found.
    pub async fn soft_delete(&self, post_id: i32, comment_id: i32) -> AppResult<bool> {
        let result = Comment::update_many()
            .col_expr(comment::Column::DeletedAt, Expr::value(Utc::now()))
            .filter(comment::Column::Id.eq(comment_id))
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_comment(id: i32, post_id: i32) -> comment::Model {
        comment::Model {
            id,
            post_id,
            user_id: 200 + id,
            reply_to: None,
            text: format!("comment {id}"),
            name: "Alice".to_string(),
            tag: None,
            created_at: Utc::now().into(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_post() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment(1, 7), create_test_comment(2, 7)]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_post(7).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 1);
    }

    #[tokio::test]
    async fn test_find_by_posts_groups_and_fills_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_comment(1, 2),
                    create_test_comment(2, 3),
                    create_test_comment(3, 2),
                ]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_posts(&[2, 3, 4]).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(
            result[&2].iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(result[&3].len(), 1);
        assert!(result[&4].is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_reports_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        assert!(!repo.soft_delete(1, 99).await.unwrap());
    }
}
