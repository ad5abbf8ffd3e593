//! Push notification assembly and dispatch.
//!
//! A new comment notifies the user it replies to (the post author, or the
//! author of the replied-to comment) and everyone following the post. Each
//! recipient gets at most one message; the kind bitmask records every reason
//! they were notified.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hollow_common::{AppError, AppResult};
use hollow_db::entities::push_message;
use hollow_db::repositories::{
    AttentionRepository, CommentRepository, PostRepository, PushMessageRepository,
    PushSettingsRepository,
};
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::services::dispatch::PushNotificationPayload;

/// Notification kind bits.
pub mod kind {
    /// System announcements.
    pub const SYSTEM: i32 = 1;
    /// Someone replied to the recipient.
    pub const REPLY_ME: i32 = 2;
    /// New comment on a post the recipient follows.
    pub const COMMENT_IN_ATTENTION: i32 = 4;
}

/// Maximum number of characters of comment text carried in a message.
pub const MESSAGE_MAX_CHARS: usize = 100;

/// Kinds pushed to users who never stored preferences.
const DEFAULT_KINDS: i32 = kind::SYSTEM | kind::REPLY_ME;

/// One message as sent to the push service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRecord {
    /// Recipient.
    pub user_id: i32,
    /// Commenter pseudonym shown as the title.
    pub title: String,
    /// Comment text, truncated to `MESSAGE_MAX_CHARS`.
    pub message: String,
    /// Post the comment belongs to.
    pub post_id: i32,
    /// Comment that triggered the message.
    pub comment_id: i32,
    /// OR of every `kind` bit that applies to this recipient.
    #[serde(rename = "type")]
    pub kind: i32,
}

impl PushRecord {
    fn into_active_model(self) -> push_message::ActiveModel {
        push_message::ActiveModel {
            user_id: Set(self.user_id),
            post_id: Set(self.post_id),
            comment_id: Set(self.comment_id),
            title: Set(self.title),
            message: Set(self.message),
            kind: Set(self.kind),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
    }

    fn from_active_model(model: push_message::ActiveModel) -> Option<Self> {
        fn take<T: Into<sea_orm::Value>>(value: ActiveValue<T>) -> Option<T> {
            match value {
                ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v),
                ActiveValue::NotSet => None,
            }
        }

        Some(Self {
            user_id: take(model.user_id)?,
            title: take(model.title)?,
            message: take(model.message)?,
            post_id: take(model.post_id)?,
            comment_id: take(model.comment_id)?,
            kind: take(model.kind)?,
        })
    }
}

/// Truncate comment text to [`MESSAGE_MAX_CHARS`] characters.
#[must_use]
pub fn truncate_message(text: &str) -> String {
    text.chars().take(MESSAGE_MAX_CHARS).collect()
}

/// Title of a reply notification.
#[must_use]
pub fn reply_title(commenter_name: &str, post_id: i32) -> String {
    format!("{commenter_name} replied to post #{post_id}")
}

/// Whether a message of `kind` should be pushed given the stored settings.
#[must_use]
pub const fn allowed(settings: Option<i32>, kind: i32) -> bool {
    match settings {
        Some(settings) => settings & kind != 0,
        None => kind & DEFAULT_KINDS != 0,
    }
}

/// Outbound push service.
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    /// Deliver messages.
    async fn send_messages(&self, messages: &[PushRecord]) -> AppResult<()>;

    /// Retract the messages of a deleted comment.
    async fn delete_messages(&self, comment_id: i32) -> AppResult<()>;
}

/// Push dispatcher that talks to the push service over HTTP.
#[derive(Clone)]
pub struct HttpPushDispatcher {
    endpoint: String,
    http_client: Arc<reqwest::Client>,
}

impl HttpPushDispatcher {
    /// Create a dispatcher for the push service at `endpoint`.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http_client: Arc::new(http_client),
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> AppResult<()> {
        let url = format!("{}/{path}", self.endpoint);
        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Push request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Push service returned {} for {path}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PushDispatcher for HttpPushDispatcher {
    async fn send_messages(&self, messages: &[PushRecord]) -> AppResult<()> {
        self.post("send_messages", &messages).await
    }

    async fn delete_messages(&self, comment_id: i32) -> AppResult<()> {
        self.post("delete_messages", &comment_id).await
    }
}

/// Push dispatcher used when no push service is configured.
#[derive(Clone, Default)]
pub struct NoOpPushDispatcher;

#[async_trait]
impl PushDispatcher for NoOpPushDispatcher {
    async fn send_messages(&self, messages: &[PushRecord]) -> AppResult<()> {
        debug!(count = messages.len(), "Push dispatch disabled, dropping messages");
        Ok(())
    }

    async fn delete_messages(&self, _comment_id: i32) -> AppResult<()> {
        Ok(())
    }
}

/// Builds, filters, stores and sends comment notifications.
#[derive(Clone)]
pub struct PushNotificationService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    attention_repo: AttentionRepository,
    settings_repo: PushSettingsRepository,
    message_repo: PushMessageRepository,
    dispatcher: Arc<dyn PushDispatcher>,
}

impl PushNotificationService {
    /// Create a new push notification service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        attention_repo: AttentionRepository,
        settings_repo: PushSettingsRepository,
        message_repo: PushMessageRepository,
        dispatcher: Arc<dyn PushDispatcher>,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            attention_repo,
            settings_repo,
            message_repo,
            dispatcher,
        }
    }

    /// Recipients of a new comment, in notification order.
    pub async fn recipients(&self, payload: &PushNotificationPayload) -> AppResult<Vec<PushRecord>> {
        let Some(post) = self.post_repo.find_live_by_id(payload.post_id).await? else {
            return Ok(vec![]);
        };

        let reply_target = match payload.reply_to_comment_id {
            Some(comment_id) => self
                .comment_repo
                .find_in_post(post.id, comment_id)
                .await?
                .map(|comment| comment.user_id),
            None => Some(post.user_id),
        };

        let record = |user_id: i32, kind: i32| PushRecord {
            user_id,
            title: reply_title(&payload.commenter_name, post.id),
            message: truncate_message(&payload.comment_text),
            post_id: post.id,
            comment_id: payload.comment_id,
            kind,
        };

        let mut records = Vec::new();
        if let Some(user_id) = reply_target.filter(|id| *id != payload.commenter_user_id) {
            records.push(record(user_id, kind::REPLY_ME));
        }

        for user_id in self.attention_repo.find_user_ids_by_post(post.id).await? {
            if user_id == payload.commenter_user_id {
                continue;
            }
            match records.iter_mut().find(|r| r.user_id == user_id) {
                Some(existing) => existing.kind |= kind::COMMENT_IN_ATTENTION,
                None => records.push(record(user_id, kind::COMMENT_IN_ATTENTION)),
            }
        }

        Ok(records)
    }

    /// Drop recipients whose preferences exclude the message kind.
    pub async fn filter_by_preferences(&self, records: Vec<PushRecord>) -> AppResult<Vec<PushRecord>> {
        let user_ids: Vec<i32> = records.iter().map(|r| r.user_id).collect();
        let settings = self.settings_repo.find_by_users(&user_ids).await?;

        Ok(records
            .into_iter()
            .filter(|r| allowed(settings.get(&r.user_id).copied(), r.kind))
            .collect())
    }

    /// Handle a push notification task.
    ///
    /// Returns the number of messages handed to the push service. Messages
    /// already stored for the same comment and recipient are not sent again,
    /// so redelivering a task is harmless.
    pub async fn notify(&self, payload: &PushNotificationPayload) -> AppResult<usize> {
        let records = self.recipients(payload).await?;
        if records.is_empty() {
            debug!(post_id = payload.post_id, "No push recipients");
            return Ok(0);
        }

        let records = self.filter_by_preferences(records).await?;
        if records.is_empty() {
            return Ok(0);
        }

        let stored = self
            .message_repo
            .insert_new(records.into_iter().map(PushRecord::into_active_model).collect())
            .await?;
        let fresh: Vec<PushRecord> = stored
            .into_iter()
            .filter_map(PushRecord::from_active_model)
            .collect();
        if fresh.is_empty() {
            debug!(comment_id = payload.comment_id, "Push messages already stored");
            return Ok(0);
        }

        match self.dispatcher.send_messages(&fresh).await {
            Ok(()) => info!(
                comment_id = payload.comment_id,
                count = fresh.len(),
                "Push messages sent"
            ),
            Err(e) => warn!(
                comment_id = payload.comment_id,
                error = %e,
                "Push dispatch failed, messages left unsent"
            ),
        }

        Ok(fresh.len())
    }
}
