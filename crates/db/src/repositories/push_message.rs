//! Push message repository.

use std::sync::Arc;

use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::entities::{push_message, PushMessage};
use hollow_common::{AppError, AppResult};

/// Push message repository for database operations.
#[derive(Clone)]
pub struct PushMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl PushMessageRepository {
    /// Create a new push message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store messages, skipping any whose `(user_id, comment_id)` already
    /// exists.
    ///
    /// Returns the input messages that were actually inserted.
    pub async fn insert_new(
        &self,
        messages: Vec<push_message::ActiveModel>,
    ) -> AppResult<Vec<push_message::ActiveModel>> {
        let mut inserted = Vec::with_capacity(messages.len());

        for message in messages {
            let rows = PushMessage::insert(message.clone())
                .on_conflict(
                    OnConflict::columns([
                        push_message::Column::UserId,
                        push_message::Column::CommentId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            if rows > 0 {
                inserted.push(message);
            }
        }

        Ok(inserted)
    }
}
