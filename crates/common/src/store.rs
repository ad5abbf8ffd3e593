//! Auxiliary fast store abstraction.
//!
//! Everything kept here is derived state: queues in flight, the hot list and
//! cached comment lists. The system of record lives in `PostgreSQL`; the
//! store can be flushed at any time and rebuilt from it.

use std::time::Duration;

use crate::AppResult;

/// One command inside a pipelined batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Delete a key of any type.
    Del {
        /// Key to delete.
        key: String,
    },
    /// Upsert a member of a sorted set.
    ZAdd {
        /// Sorted set key.
        key: String,
        /// Member score.
        score: f64,
        /// Member bytes.
        member: Vec<u8>,
    },
    /// Remove members from a sorted set.
    ZRem {
        /// Sorted set key.
        key: String,
        /// Members to remove.
        members: Vec<Vec<u8>>,
    },
    /// Push a value onto the head of a list.
    LPush {
        /// List key.
        key: String,
        /// Value bytes.
        value: Vec<u8>,
    },
}

/// Operations the background subsystem needs from the fast store.
#[async_trait::async_trait]
pub trait FastStore: Send + Sync {
    /// Get a plain value.
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Set a plain value with a time-to-live.
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()>;

    /// Delete a key.
    async fn del(&self, key: &str) -> AppResult<()>;

    /// Upsert a sorted set member.
    async fn zadd(&self, key: &str, score: f64, member: Vec<u8>) -> AppResult<()>;

    /// Remove a sorted set member. Removing a missing member is not an error.
    async fn zrem(&self, key: &str, member: Vec<u8>) -> AppResult<()>;

    /// Score of a sorted set member.
    async fn zscore(&self, key: &str, member: Vec<u8>) -> AppResult<Option<f64>>;

    /// Members with `score <= max`, lowest score first.
    async fn zrange_by_score(&self, key: &str, max: f64) -> AppResult<Vec<Vec<u8>>>;

    /// Members by rank, highest score first. `stop` is inclusive.
    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<Vec<u8>>>;

    /// Push a value onto the head of a list.
    async fn lpush(&self, key: &str, value: Vec<u8>) -> AppResult<()>;

    /// Pop from the tail of a list, waiting indefinitely for a value.
    async fn brpop(&self, key: &str) -> AppResult<Vec<u8>>;

    /// Length of a list.
    async fn llen(&self, key: &str) -> AppResult<u64>;

    /// Send several commands in one round trip.
    ///
    /// Commands are applied in order. The batch is not a transaction: a
    /// failure part-way leaves the earlier commands applied.
    async fn exec_batch(&self, commands: Vec<StoreCommand>) -> AppResult<()>;
}

/// Key layout in the fast store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    prefix: String,
}

impl Keyspace {
    /// Create a keyspace under the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// List holding tasks ready to run.
    #[must_use]
    pub fn immediate_queue(&self) -> String {
        format!("{}:queue:default", self.prefix)
    }

    /// Sorted set of tasks scored by due time.
    #[must_use]
    pub fn delayed_queue(&self) -> String {
        format!("{}:queue:delayed", self.prefix)
    }

    /// Sorted set of post ids scored by popularity.
    #[must_use]
    pub fn hot_list(&self) -> String {
        format!("{}:hot_list:zset", self.prefix)
    }

    /// Cached comment list of a post.
    #[must_use]
    pub fn comments(&self, post_id: i32) -> String {
        format!("{}:comments:{post_id}", self.prefix)
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new("hollow")
    }
}
