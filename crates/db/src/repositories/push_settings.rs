//! Push settings repository.

use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{push_settings, PushSettings};
use hollow_common::{AppError, AppResult};

/// Push settings repository for database operations.
#[derive(Clone)]
pub struct PushSettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl PushSettingsRepository {
    /// Create a new push settings repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Settings bitmasks of the given users. Users without a row are absent.
    pub async fn find_by_users(&self, user_ids: &[i32]) -> AppResult<HashMap<i32, i32>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = PushSettings::find()
            .filter(push_settings::Column::UserId.is_in(user_ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.user_id, r.settings)).collect())
    }
}
