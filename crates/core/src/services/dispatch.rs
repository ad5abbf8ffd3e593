//! Background task dispatch.
//!
//! Provides an abstraction for queueing background tasks.
//! The actual implementation is provided by the queue crate.

use std::time::Duration;

use async_trait::async_trait;
use hollow_common::AppResult;
use serde::{Deserialize, Serialize};

/// Payload of a push notification task.
///
/// Points at rows that the handler re-reads; it is not self-sufficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotificationPayload {
    /// Post that received the comment.
    pub post_id: i32,
    /// Author of the comment; never notified about their own comment.
    pub commenter_user_id: i32,
    /// The new comment.
    pub comment_id: i32,
    /// Comment body, used as the notification text.
    pub comment_text: String,
    /// Pseudonym the commenter holds under this post.
    pub commenter_name: String,
    /// Comment being replied to, if the new comment is a reply.
    #[serde(default)]
    pub reply_to_comment_id: Option<i32>,
}

/// Email subflow with its specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmailKind {
    /// Address validation code for sign-up.
    Validation {
        /// Code the user types back.
        code: String,
    },
    /// Password recovery nonce.
    NonceRecovery {
        /// Nonce embedded in the recovery link.
        nonce: String,
    },
    /// Validation code for account removal.
    Unregister {
        /// Code the user types back.
        code: String,
    },
}

/// Payload of an email task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    /// Destination address.
    pub recipient: String,
    /// Subflow, flattened next to the recipient on the wire.
    #[serde(flatten)]
    pub kind: EmailKind,
}

/// Trait for background task dispatch.
///
/// This allows the core services to queue work without directly depending
/// on the queue implementation.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Queue a push notification for a new comment.
    async fn queue_push_notification(&self, payload: PushNotificationPayload) -> AppResult<()>;

    /// Queue an email, optionally delayed.
    async fn queue_email(&self, payload: EmailPayload, delay: Option<Duration>) -> AppResult<()>;
}

/// A no-op implementation of `TaskDispatcher` for tests or when background
/// processing is disabled.
#[derive(Clone, Default)]
pub struct NoOpTaskDispatcher;

#[async_trait]
impl TaskDispatcher for NoOpTaskDispatcher {
    async fn queue_push_notification(&self, _payload: PushNotificationPayload) -> AppResult<()> {
        Ok(())
    }

    async fn queue_email(&self, _payload: EmailPayload, _delay: Option<Duration>) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_payload_shape() {
        let payload = EmailPayload {
            recipient: "a@example.com".to_string(),
            kind: EmailKind::NonceRecovery {
                nonce: "n0nce".to_string(),
            },
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "nonce_recovery");
        assert_eq!(json["nonce"], "n0nce");
        assert_eq!(json["recipient"], "a@example.com");

        let back: EmailPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_push_payload_reply_defaults_to_none() {
        let payload: PushNotificationPayload = serde_json::from_str(
            r#"{"post_id":1,"commenter_user_id":2,"comment_id":3,"comment_text":"hi","commenter_name":"Alice"}"#,
        )
        .unwrap();
        assert_eq!(payload.reply_to_comment_id, None);
    }
}
