//! Content mutations and the derived state they maintain.
//!
//! Every mutation here writes the database first. Hot list, comment cache,
//! queue and push service updates follow and are best-effort: their
//! failures are logged and never fail the mutation.

use std::sync::Arc;

use chrono::Utc;
use hollow_common::{AppError, AppResult};
use hollow_db::entities::comment;
use hollow_db::repositories::{CommentRepository, PostRepository};
use sea_orm::Set;
use tracing::{info, warn};

use crate::services::comment_cache::CommentCache;
use crate::services::commenter_name::CommenterNameAllocator;
use crate::services::dispatch::{PushNotificationPayload, TaskDispatcher};
use crate::services::push::PushDispatcher;
use crate::services::ranking::RankingCache;

/// Input for creating a comment.
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    /// Post being commented on.
    pub post_id: i32,
    /// Author of the comment.
    pub user_id: i32,
    /// Comment body.
    pub text: String,
    /// Optional content tag, stored as given.
    pub tag: Option<String>,
    /// Comment being replied to, under the same post.
    pub reply_to: Option<i32>,
}

/// Content service for post and comment mutations.
#[derive(Clone)]
pub struct ContentService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    names: CommenterNameAllocator,
    comment_cache: CommentCache,
    ranking: RankingCache,
    tasks: Arc<dyn TaskDispatcher>,
    push: Arc<dyn PushDispatcher>,
}

impl ContentService {
    /// Create a new content service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        names: CommenterNameAllocator,
        comment_cache: CommentCache,
        ranking: RankingCache,
        tasks: Arc<dyn TaskDispatcher>,
        push: Arc<dyn PushDispatcher>,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            names,
            comment_cache,
            ranking,
            tasks,
            push,
        }
    }

    /// Create a comment on a live post.
    pub async fn create_comment(&self, input: CreateCommentInput) -> AppResult<comment::Model> {
        let post = self.post_repo.get_live_by_id(input.post_id).await?;

        if let Some(reply_to) = input.reply_to {
            self.comment_repo
                .find_in_post(post.id, reply_to)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Comment {reply_to} not found")))?;
        }

        let name = self
            .names
            .assign_or_get(post.id, post.user_id, input.user_id)
            .await?;

        let comment = self
            .comment_repo
            .create(comment::ActiveModel {
                post_id: Set(post.id),
                user_id: Set(input.user_id),
                reply_to: Set(input.reply_to),
                text: Set(input.text),
                name: Set(name),
                tag: Set(input.tag),
                created_at: Set(Utc::now().into()),
                deleted_at: Set(None),
                ..Default::default()
            })
            .await?;

        self.post_repo.increment_replies(post.id).await?;

        self.invalidate_comments(post.id).await;
        self.refresh_score(post.id).await;

        let payload = PushNotificationPayload {
            post_id: post.id,
            commenter_user_id: comment.user_id,
            comment_id: comment.id,
            comment_text: comment.text.clone(),
            commenter_name: comment.name.clone(),
            reply_to_comment_id: comment.reply_to,
        };
        if let Err(e) = self.tasks.queue_push_notification(payload).await {
            warn!(comment_id = comment.id, error = %e, "Failed to queue push notification");
        }

        info!(post_id = post.id, comment_id = comment.id, "Comment created");
        Ok(comment)
    }

    /// Delete a comment.
    pub async fn delete_comment(&self, post_id: i32, comment_id: i32) -> AppResult<()> {
        if !self.comment_repo.soft_delete(post_id, comment_id).await? {
            return Err(AppError::NotFound(format!("Comment {comment_id} not found")));
        }

        self.post_repo.decrement_replies(post_id).await?;

        self.refresh_score(post_id).await;
        self.invalidate_comments(post_id).await;

        if let Err(e) = self.push.delete_messages(comment_id).await {
            warn!(comment_id, error = %e, "Failed to send deletion notice");
        }

        info!(post_id, comment_id, "Comment deleted");
        Ok(())
    }

    /// Delete a post.
    pub async fn delete_post(&self, post_id: i32) -> AppResult<()> {
        self.post_repo.soft_delete(post_id).await?;

        if let Err(e) = self.ranking.remove(post_id).await {
            warn!(post_id, error = %e, "Failed to remove post from hot list");
        }

        info!(post_id, "Post deleted");
        Ok(())
    }

    /// Add `delta` likes (negative to remove).
    pub async fn record_like(&self, post_id: i32, delta: i32) -> AppResult<()> {
        self.post_repo.add_likes(post_id, delta).await?;
        self.refresh_score(post_id).await;
        Ok(())
    }

    /// Count a report against a post.
    pub async fn record_report(&self, post_id: i32) -> AppResult<()> {
        self.post_repo.increment_reports(post_id).await?;
        self.refresh_score(post_id).await;
        Ok(())
    }

    async fn refresh_score(&self, post_id: i32) {
        if let Err(e) = self.ranking.update_score(post_id).await {
            warn!(post_id, error = %e, "Failed to update hot score");
        }
    }

    async fn invalidate_comments(&self, post_id: i32) {
        if let Err(e) = self.comment_cache.invalidate(post_id).await {
            warn!(post_id, error = %e, "Failed to invalidate comment cache");
        }
    }
}
