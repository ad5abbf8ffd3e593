//! Producer side of the task queue.
//!
//! Immediate tasks are pushed onto the head of a list and popped from its
//! tail by the worker. Delayed tasks sit in a sorted set scored by their due
//! time until the scheduler promotes them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hollow_common::{AppResult, FastStore, Keyspace};
use hollow_core::{EmailPayload, PushNotificationPayload, TaskDispatcher};
use serde::Serialize;
use tracing::debug;

use crate::jobs::{Task, TaskType};

/// Seconds since the epoch, with millisecond precision.
#[must_use]
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

/// Fast-store backed task queue.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn FastStore>,
    keys: Keyspace,
}

impl TaskQueue {
    /// Create a new task queue.
    #[must_use]
    pub fn new(store: Arc<dyn FastStore>, keys: Keyspace) -> Self {
        Self { store, keys }
    }

    /// Queue a task for immediate execution.
    pub async fn enqueue(&self, task_type: TaskType, payload: Vec<u8>) -> AppResult<()> {
        let bytes = Task::new(task_type, payload).encode()?;
        self.store.lpush(&self.keys.immediate_queue(), bytes).await?;

        debug!(task_type = %task_type, "Task queued");
        Ok(())
    }

    /// Queue a task to run once `delay` has elapsed.
    pub async fn enqueue_with_delay(
        &self,
        delay: Duration,
        task_type: TaskType,
        payload: Vec<u8>,
    ) -> AppResult<()> {
        let due = epoch_seconds(Utc::now()) + delay.as_secs_f64();
        let bytes = Task::new(task_type, payload).with_nonce().encode()?;
        self.store
            .zadd(&self.keys.delayed_queue(), due, bytes)
            .await?;

        debug!(task_type = %task_type, due, "Delayed task queued");
        Ok(())
    }

    async fn enqueue_json<T: Serialize + Sync>(
        &self,
        task_type: TaskType,
        payload: &T,
        delay: Option<Duration>,
    ) -> AppResult<()> {
        let payload = serde_json::to_vec(payload)?;
        match delay {
            Some(delay) => self.enqueue_with_delay(delay, task_type, payload).await,
            None => self.enqueue(task_type, payload).await,
        }
    }
}

#[async_trait]
impl TaskDispatcher for TaskQueue {
    async fn queue_push_notification(&self, payload: PushNotificationPayload) -> AppResult<()> {
        self.enqueue_json(TaskType::PushNotification, &payload, None)
            .await
    }

    async fn queue_email(&self, payload: EmailPayload, delay: Option<Duration>) -> AppResult<()> {
        self.enqueue_json(TaskType::EmailSend, &payload, delay)
            .await
    }
}
