//! Push notification task handler.

use async_trait::async_trait;
use hollow_common::AppResult;
use hollow_core::{PushNotificationPayload, PushNotificationService};
use tracing::debug;

use super::TaskHandler;

/// Fans out the notifications of a `notification:push` task.
#[derive(Clone)]
pub struct PushHandler {
    service: PushNotificationService,
}

impl PushHandler {
    /// Create a new push handler.
    #[must_use]
    pub const fn new(service: PushNotificationService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TaskHandler for PushHandler {
    async fn handle(&self, payload: &[u8]) -> AppResult<()> {
        let payload: PushNotificationPayload = serde_json::from_slice(payload)?;
        let sent = self.service.notify(&payload).await?;
        debug!(
            post_id = payload.post_id,
            comment_id = payload.comment_id,
            sent,
            "Push task handled"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hollow_core::NoOpPushDispatcher;
    use hollow_db::entities::post;
    use hollow_db::repositories::{
        AttentionRepository, CommentRepository, PostRepository, PushMessageRepository,
        PushSettingsRepository,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn handler(db: MockDatabase) -> PushHandler {
        let db = Arc::new(db.into_connection());
        PushHandler::new(PushNotificationService::new(
            PostRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
            AttentionRepository::new(db.clone()),
            PushSettingsRepository::new(db.clone()),
            PushMessageRepository::new(db),
            Arc::new(NoOpPushDispatcher),
        ))
    }

    fn payload() -> Vec<u8> {
        serde_json::to_vec(&PushNotificationPayload {
            post_id: 3,
            commenter_user_id: 9,
            comment_id: 11,
            comment_text: "hello".to_string(),
            commenter_name: "Alice".to_string(),
            reply_to_comment_id: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_deleted_post_is_a_no_op() {
        // Two lookups: the task is delivered twice, as after a duplicate promotion.
        let handler = handler(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .append_query_results([Vec::<post::Model>::new()]),
        );
        handler.handle(&payload()).await.unwrap();
        handler.handle(&payload()).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_fails() {
        let handler = handler(MockDatabase::new(DatabaseBackend::Postgres));
        assert!(handler.handle(b"{}").await.is_err());
    }
}
