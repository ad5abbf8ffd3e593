//! Post repository.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{post, Post};
use hollow_common::{AppError, AppResult};

/// SQL form of the hot score:
/// `like_num*3 + reply_num - report_num*10 + created_at_unix/1800`.
pub const HOT_SCORE_SQL: &str =
    "like_num * 3 + reply_num - report_num * 10 + EXTRACT(EPOCH FROM created_at) / 1800";

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID, including soft-deleted posts.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, ignoring soft-deleted posts.
    pub async fn find_live_by_id(&self, id: i32) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .filter(post::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a live post by ID or return [`AppError::PostNotFound`].
    pub async fn get_live_by_id(&self, id: i32) -> AppResult<post::Model> {
        self.find_live_by_id(id)
            .await?
            .ok_or(AppError::PostNotFound(id))
    }

    /// Top live posts by hot score, highest first.
    pub async fn find_hot(&self, limit: u64) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::DeletedAt.is_null())
            .order_by(Expr::cust(HOT_SCORE_SQL), Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Load live posts by ID, returned in the order of `ids`.
    ///
    /// IDs without a live post are skipped.
    pub async fn find_by_ids_in_order(&self, ids: &[i32]) -> AppResult<Vec<post::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let posts = Post::find()
            .filter(post::Column::Id.is_in(ids.iter().copied()))
            .filter(post::Column::DeletedAt.is_null())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_id: HashMap<i32, post::Model> = posts.into_iter().map(|p| (p.id, p)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Adjust the like counter by `delta`, never going below zero.
    pub async fn add_likes(&self, id: i32, delta: i32) -> AppResult<()> {
        self.update_counter(id, post::Column::LikeNum, "like_num", delta)
            .await
    }

    /// Increment the reply counter.
    pub async fn increment_replies(&self, id: i32) -> AppResult<()> {
        self.update_counter(id, post::Column::ReplyNum, "reply_num", 1)
            .await
    }

    /// Decrement the reply counter, never going below zero.
    pub async fn decrement_replies(&self, id: i32) -> AppResult<()> {
        self.update_counter(id, post::Column::ReplyNum, "reply_num", -1)
            .await
    }

    /// Increment the report counter.
    pub async fn increment_reports(&self, id: i32) -> AppResult<()> {
        self.update_counter(id, post::Column::ReportNum, "report_num", 1)
            .await
    }

    async fn update_counter(
        &self,
        id: i32,
        column: post::Column,
        column_name: &str,
        delta: i32,
    ) -> AppResult<()> {
        let expr = if delta >= 0 {
            Expr::col(column).add(delta)
        } else {
            Expr::cust(format!("GREATEST({column_name} - {}, 0)", -delta))
        };

        Post::update_many()
            .col_expr(column, expr)
            .col_expr(post::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(post::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Mark a post as deleted.
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        Post::update_many()
            .col_expr(post::Column::DeletedAt, Expr::value(Utc::now()))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
