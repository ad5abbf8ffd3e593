//! Task consumer and its handlers.

mod email;
mod push;

pub use email::EmailHandler;
pub use push::PushHandler;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hollow_common::{AppResult, FastStore, Keyspace};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::QueueError;
use crate::jobs::{Task, TaskType};

/// Runs the payload of one task type.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Handle a task payload.
    async fn handle(&self, payload: &[u8]) -> AppResult<()>;
}

/// Single sequential consumer of the immediate queue.
///
/// Delivery is at most once with respect to handler failures: a task whose
/// handler fails is logged and dropped.
#[derive(Clone)]
pub struct Worker {
    store: Arc<dyn FastStore>,
    keys: Keyspace,
    handlers: HashMap<TaskType, Arc<dyn TaskHandler>>,
    retry_delay: Duration,
}

impl Worker {
    /// Create a worker with no handlers.
    #[must_use]
    pub fn new(store: Arc<dyn FastStore>, keys: Keyspace, retry_delay: Duration) -> Self {
        Self {
            store,
            keys,
            handlers: HashMap::new(),
            retry_delay,
        }
    }

    /// Register the handler for a task type, replacing any previous one.
    #[must_use]
    pub fn register(mut self, task_type: TaskType, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(task_type, handler);
        self
    }

    /// Decode one popped task and run its handler.
    pub async fn process(&self, bytes: &[u8]) -> Result<TaskType, QueueError> {
        let task = Task::decode(bytes)?;
        let task_type = task.kind()?;
        let handler = self
            .handlers
            .get(&task_type)
            .ok_or_else(|| QueueError::UnknownTaskType(task.task_type.clone()))?;

        handler
            .handle(&task.payload)
            .await
            .map_err(|source| QueueError::Handler { task_type, source })?;

        Ok(task_type)
    }

    /// Pop and process tasks forever.
    pub async fn run(self) {
        let queue = self.keys.immediate_queue();
        loop {
            let bytes = match self.store.brpop(&queue).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(
                        code = e.error_code(),
                        error = %e,
                        retry_in_secs = self.retry_delay.as_secs(),
                        "Failed to pop task"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            };

            match self.process(&bytes).await {
                Ok(task_type) => debug!(task_type = %task_type, "Task done"),
                Err(QueueError::Handler { task_type, source }) => {
                    error!(
                        task_type = %task_type,
                        code = source.error_code(),
                        error = %source,
                        "Task failed"
                    );
                }
                Err(e) => warn!(error = %e, "Dropping task"),
            }
        }
    }

    /// Run the consumer loop on a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hollow_common::{AppError, MemoryStore, StoreCommand};

    use crate::queue::TaskQueue;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    #[async_trait]
    impl TaskHandler for Recorder {
        async fn handle(&self, payload: &[u8]) -> AppResult<()> {
            self.seen.lock().unwrap().push(payload.to_vec());
            if self.fail {
                return Err(AppError::ExternalService("down".to_string()));
            }
            Ok(())
        }
    }

    /// Fails the first `outages` pops, then behaves like `MemoryStore`.
    struct FlakyStore {
        inner: MemoryStore,
        outages: AtomicUsize,
    }

    #[async_trait]
    impl FastStore for FlakyStore {
        async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
            self.inner.set_ex(key, value, ttl).await
        }

        async fn del(&self, key: &str) -> AppResult<()> {
            self.inner.del(key).await
        }

        async fn zadd(&self, key: &str, score: f64, member: Vec<u8>) -> AppResult<()> {
            self.inner.zadd(key, score, member).await
        }

        async fn zrem(&self, key: &str, member: Vec<u8>) -> AppResult<()> {
            self.inner.zrem(key, member).await
        }

        async fn zscore(&self, key: &str, member: Vec<u8>) -> AppResult<Option<f64>> {
            self.inner.zscore(key, member).await
        }

        async fn zrange_by_score(&self, key: &str, max: f64) -> AppResult<Vec<Vec<u8>>> {
            self.inner.zrange_by_score(key, max).await
        }

        async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<Vec<u8>>> {
            self.inner.zrevrange(key, start, stop).await
        }

        async fn lpush(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
            self.inner.lpush(key, value).await
        }

        async fn brpop(&self, key: &str) -> AppResult<Vec<u8>> {
            let down = self
                .outages
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if down {
                return Err(AppError::Redis("Connection refused".to_string()));
            }
            self.inner.brpop(key).await
        }

        async fn llen(&self, key: &str) -> AppResult<u64> {
            self.inner.llen(key).await
        }

        async fn exec_batch(&self, commands: Vec<StoreCommand>) -> AppResult<()> {
            self.inner.exec_batch(commands).await
        }
    }

    fn worker(store: Arc<MemoryStore>, handler: Arc<Recorder>) -> Worker {
        Worker::new(store, Keyspace::default(), Duration::from_secs(5))
            .register(TaskType::PushNotification, handler)
    }

    #[tokio::test]
    async fn test_round_trip_through_queue() {
        let store = Arc::new(MemoryStore::new());
        let queue = TaskQueue::new(store.clone(), Keyspace::default());
        let handler = Arc::new(Recorder::default());
        let worker = worker(store.clone(), handler.clone());

        let payload = br#"{"post_id":7}"#.to_vec();
        queue
            .enqueue(TaskType::PushNotification, payload.clone())
            .await
            .unwrap();

        let bytes = store.brpop("hollow:queue:default").await.unwrap();
        let task_type = worker.process(&bytes).await.unwrap();

        assert_eq!(task_type, TaskType::PushNotification);
        assert_eq!(*handler.seen.lock().unwrap(), vec![payload]);
    }

    #[tokio::test]
    async fn test_undecodable_task_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let handler = Arc::new(Recorder::default());
        let worker = worker(store, handler.clone());

        let result = worker.process(b"not a task").await;
        assert!(matches!(result, Err(QueueError::Decode(_))));
        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_type_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let worker = worker(store, Arc::new(Recorder::default()));

        let email = Task::new(TaskType::EmailSend, b"{}".to_vec()).encode().unwrap();
        assert!(matches!(
            worker.process(&email).await,
            Err(QueueError::UnknownTaskType(name)) if name == "email:send"
        ));

        let foreign = br#"{"type":"sms:send","payload":""}"#;
        assert!(matches!(
            worker.process(foreign).await,
            Err(QueueError::UnknownTaskType(name)) if name == "sms:send"
        ));
    }

    #[tokio::test]
    async fn test_handler_failure_is_surfaced() {
        let store = Arc::new(MemoryStore::new());
        let handler = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let worker = worker(store, handler);

        let task = Task::new(TaskType::PushNotification, b"{}".to_vec())
            .encode()
            .unwrap();
        assert!(matches!(
            worker.process(&task).await,
            Err(QueueError::Handler {
                task_type: TaskType::PushNotification,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_run_drains_queue_past_failures() {
        let store = Arc::new(MemoryStore::new());
        let queue = TaskQueue::new(store.clone(), Keyspace::default());
        let handler = Arc::new(Recorder::default());
        let handle = worker(store.clone(), handler.clone()).spawn();

        store
            .lpush("hollow:queue:default", b"garbage".to_vec())
            .await
            .unwrap();
        queue
            .enqueue(TaskType::PushNotification, b"ok".to_vec())
            .await
            .unwrap();

        for _ in 0..100 {
            if !handler.seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(*handler.seen.lock().unwrap(), vec![b"ok".to_vec()]);
        assert_eq!(store.llen("hollow:queue:default").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_backs_off_while_store_is_down() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            outages: AtomicUsize::new(2),
        });
        let handler = Arc::new(Recorder::default());
        let retry_delay = Duration::from_secs(5);

        let task = Task::new(TaskType::PushNotification, b"ok".to_vec())
            .encode()
            .unwrap();
        store.inner.lpush("hollow:queue:default", task).await.unwrap();

        let started = tokio::time::Instant::now();
        let handle = Worker::new(store.clone(), Keyspace::default(), retry_delay)
            .register(TaskType::PushNotification, handler.clone())
            .spawn();

        for _ in 0..100 {
            if !handler.seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        handle.abort();

        assert_eq!(*handler.seen.lock().unwrap(), vec![b"ok".to_vec()]);
        assert_eq!(store.outages.load(Ordering::SeqCst), 0);
        // One full delay per failed pop.
        assert!(started.elapsed() >= retry_delay * 2);
    }
}
