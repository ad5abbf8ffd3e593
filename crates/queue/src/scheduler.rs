//! Promotion of due delayed tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hollow_common::{AppResult, FastStore, Keyspace, StoreCommand};
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::queue::epoch_seconds;

/// Moves delayed tasks onto the immediate queue once they are due.
///
/// Push and removal go out in one pipeline but are not atomic. A crash
/// between them delivers the task twice, never zero times.
#[derive(Clone)]
pub struct DelayedScheduler {
    store: Arc<dyn FastStore>,
    keys: Keyspace,
    poll_interval: Duration,
}

impl DelayedScheduler {
    /// Create a new scheduler.
    #[must_use]
    pub fn new(store: Arc<dyn FastStore>, keys: Keyspace, poll_interval: Duration) -> Self {
        Self {
            store,
            keys,
            poll_interval,
        }
    }

    /// Promote every task due at `now` (epoch seconds). Returns how many moved.
    pub async fn promote_due(&self, now: f64) -> AppResult<usize> {
        let delayed = self.keys.delayed_queue();
        let due = self.store.zrange_by_score(&delayed, now).await?;
        if due.is_empty() {
            return Ok(0);
        }

        let count = due.len();
        let immediate = self.keys.immediate_queue();
        let mut batch = Vec::with_capacity(count * 2);
        for member in due {
            batch.push(StoreCommand::LPush {
                key: immediate.clone(),
                value: member.clone(),
            });
            batch.push(StoreCommand::ZRem {
                key: delayed.clone(),
                members: vec![member],
            });
        }
        self.store.exec_batch(batch).await?;

        Ok(count)
    }

    /// Poll forever.
    pub async fn run(self) {
        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.promote_due(epoch_seconds(Utc::now())).await {
                Ok(0) => {}
                Ok(count) => tracing::debug!(count, "Promoted delayed tasks"),
                Err(e) => tracing::error!(error = %e, "Failed to poll delayed tasks"),
            }
        }
    }

    /// Run the poll loop on a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
