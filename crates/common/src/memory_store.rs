//! In-process implementation of [`FastStore`].
//!
//! Used by tests and by single-process development setups. Semantics follow
//! Redis for every operation the subsystem relies on: TTL expiry on read,
//! sorted sets ordered by `(score, member)`, `LPUSH`/`BRPOP` FIFO.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::store::{FastStore, StoreCommand};
use crate::{AppError, AppResult};

#[derive(Default)]
struct Inner {
    values: HashMap<String, (Vec<u8>, Instant)>,
    sorted_sets: HashMap<String, HashMap<Vec<u8>, f64>>,
    lists: HashMap<String, VecDeque<Vec<u8>>>,
}

impl Inner {
    fn del(&mut self, key: &str) {
        self.values.remove(key);
        self.sorted_sets.remove(key);
        self.lists.remove(key);
    }

    fn zadd(&mut self, key: &str, score: f64, member: Vec<u8>) {
        self.sorted_sets
            .entry(key.to_string())
            .or_default()
            .insert(member, score);
    }

    fn zrem(&mut self, key: &str, members: &[Vec<u8>]) {
        if let Some(set) = self.sorted_sets.get_mut(key) {
            for member in members {
                set.remove(member);
            }
            if set.is_empty() {
                self.sorted_sets.remove(key);
            }
        }
    }

    fn lpush(&mut self, key: &str, value: Vec<u8>) {
        self.lists.entry(key.to_string()).or_default().push_front(value);
    }

    /// Members ordered by ascending `(score, member)`.
    fn sorted(&self, key: &str) -> Vec<(Vec<u8>, f64)> {
        let mut members: Vec<(Vec<u8>, f64)> = self
            .sorted_sets
            .get(key)
            .map(|set| set.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        members
    }
}

/// In-memory fast store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    pushed: Notify,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    /// Snapshot of a list, head first.
    pub fn list_snapshot(&self, key: &str) -> AppResult<Vec<Vec<u8>>> {
        Ok(self
            .lock()?
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Number of members in a sorted set.
    pub fn zcard(&self, key: &str) -> AppResult<usize> {
        Ok(self.lock()?.sorted_sets.get(key).map_or(0, HashMap::len))
    }

    /// Whether a plain value is currently stored (and unexpired).
    pub fn contains_value(&self, key: &str) -> AppResult<bool> {
        let now = Instant::now();
        Ok(self
            .lock()?
            .values
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at > now))
    }

    fn try_pop(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.lock()?.lists.get_mut(key).and_then(VecDeque::pop_back))
    }
}

#[async_trait::async_trait]
impl FastStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut inner = self.lock()?;
        match inner.values.get(key) {
            Some((value, expires_at)) if *expires_at > now => Ok(Some(value.clone())),
            Some(_) => {
                inner.values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
        let expires_at = Instant::now() + ttl;
        self.lock()?
            .values
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        self.lock()?.del(key);
        Ok(())
    }

    async fn zadd(&self, key: &str, score: f64, member: Vec<u8>) -> AppResult<()> {
        self.lock()?.zadd(key, score, member);
        Ok(())
    }

    async fn zrem(&self, key: &str, member: Vec<u8>) -> AppResult<()> {
        self.lock()?.zrem(key, &[member]);
        Ok(())
    }

    async fn zscore(&self, key: &str, member: Vec<u8>) -> AppResult<Option<f64>> {
        Ok(self
            .lock()?
            .sorted_sets
            .get(key)
            .and_then(|set| set.get(&member).copied()))
    }

    async fn zrange_by_score(&self, key: &str, max: f64) -> AppResult<Vec<Vec<u8>>> {
        Ok(self
            .lock()?
            .sorted(key)
            .into_iter()
            .filter(|(_, score)| *score <= max)
            .map(|(member, _)| member)
            .collect())
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<Vec<u8>>> {
        let mut members = self.lock()?.sorted(key);
        members.reverse();

        let len = members.len() as i64;
        let normalize = |index: i64| if index < 0 { len + index } else { index };
        let start = normalize(start).max(0);
        let stop = normalize(stop).min(len - 1);
        if len == 0 || start > stop {
            return Ok(Vec::new());
        }

        Ok(members
            .into_iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(member, _)| member)
            .collect())
    }

    async fn lpush(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        self.lock()?.lpush(key, value);
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn brpop(&self, key: &str) -> AppResult<Vec<u8>> {
        loop {
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the
            // await is not missed.
            notified.as_mut().enable();

            if let Some(value) = self.try_pop(key)? {
                return Ok(value);
            }
            notified.await;
        }
    }

    async fn llen(&self, key: &str) -> AppResult<u64> {
        Ok(self.lock()?.lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn exec_batch(&self, commands: Vec<StoreCommand>) -> AppResult<()> {
        let mut pushed = false;
        {
            let mut inner = self.lock()?;
            for command in commands {
                match command {
                    StoreCommand::Del { key } => inner.del(&key),
                    StoreCommand::ZAdd { key, score, member } => inner.zadd(&key, score, member),
                    StoreCommand::ZRem { key, members } => inner.zrem(&key, &members),
                    StoreCommand::LPush { key, value } => {
                        inner.lpush(&key, value);
                        pushed = true;
                    }
                }
            }
        }
        if pushed {
            self.pushed.notify_waiters();
        }
        Ok(())
    }
}
