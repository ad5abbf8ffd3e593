//! Redis implementation of [`FastStore`].

use std::time::Duration;

use fred::clients::Client;
use fred::interfaces::{ClientLike, KeysInterface, ListInterface, SortedSetsInterface};
use fred::types::config::{Config as RedisConfig, ReconnectPolicy};
use fred::types::{Expiration, Value};
use tracing::{info, warn};

use crate::store::{FastStore, StoreCommand};
use crate::{AppError, AppResult};

/// Redis-backed fast store.
///
/// Blocking pops park their connection until a value arrives, so they run on
/// a dedicated client. Every other command shares the main client.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    blocking: Client,
}

/// Retry forever, backing off from 100 ms to 30 s.
fn reconnect_policy() -> ReconnectPolicy {
    ReconnectPolicy::new_exponential(0, 100, 30_000, 2)
}

impl RedisStore {
    /// Connect both clients to the given Redis URL.
    ///
    /// Both clients reconnect on their own after the connection drops, so
    /// callers only see errors while Redis is unreachable.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let config = RedisConfig::from_url(url)?;

        let client = Client::new(config.clone(), None, None, Some(reconnect_policy()));
        client.init().await?;

        let blocking = Client::new(config, None, None, Some(reconnect_policy()));
        blocking.init().await?;

        info!("Redis fast store initialized");

        Ok(Self { client, blocking })
    }

    /// Close both connections.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.blocking.quit().await?;
        self.client.quit().await?;
        info!("Redis fast store shutdown");
        Ok(())
    }
}

fn bytes_value(bytes: Vec<u8>) -> Value {
    Value::Bytes(bytes.into())
}

fn value_bytes(value: &Value) -> Option<Vec<u8>> {
    value.as_bytes().map(<[u8]>::to_vec)
}

#[async_trait::async_trait]
impl FastStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let value: Value = self.client.get(key).await?;
        Ok(value_bytes(&value))
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
        self.client
            .set::<(), _, _>(
                key,
                bytes_value(value),
                Some(Expiration::EX(ttl.as_secs().max(1) as i64)),
                None,
                false,
            )
            .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        self.client.del::<(), _>(key).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, score: f64, member: Vec<u8>) -> AppResult<()> {
        self.client
            .zadd::<(), _, _>(key, None, None, false, false, (score, bytes_value(member)))
            .await?;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: Vec<u8>) -> AppResult<()> {
        self.client
            .zrem::<(), _, _>(key, bytes_value(member))
            .await?;
        Ok(())
    }

    async fn zscore(&self, key: &str, member: Vec<u8>) -> AppResult<Option<f64>> {
        let score: Option<f64> = self.client.zscore(key, bytes_value(member)).await?;
        Ok(score)
    }

    async fn zrange_by_score(&self, key: &str, max: f64) -> AppResult<Vec<Vec<u8>>> {
        let values: Vec<Value> = self
            .client
            .zrangebyscore(key, "-inf", max, false, None)
            .await?;
        Ok(values.iter().filter_map(value_bytes).collect())
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<Vec<u8>>> {
        let values: Vec<Value> = self.client.zrevrange(key, start, stop, false).await?;
        Ok(values.iter().filter_map(value_bytes).collect())
    }

    async fn lpush(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        self.client
            .lpush::<(), _, _>(key, bytes_value(value))
            .await?;
        Ok(())
    }

    async fn brpop(&self, key: &str) -> AppResult<Vec<u8>> {
        loop {
            // A zero timeout blocks until an element is available.
            let reply: Value = self.blocking.brpop(key, 0.0).await?;
            match reply {
                // [key, element]
                Value::Array(mut items) if items.len() == 2 => {
                    let element = items.pop().unwrap_or(Value::Null);
                    return value_bytes(&element).ok_or_else(|| {
                        AppError::Redis(format!("Unexpected BRPOP element from {key}"))
                    });
                }
                Value::Null => continue,
                other => {
                    warn!(key, reply = ?other, "Unexpected BRPOP reply");
                    return Err(AppError::Redis(format!("Unexpected BRPOP reply from {key}")));
                }
            }
        }
    }

    async fn llen(&self, key: &str) -> AppResult<u64> {
        let len: u64 = self.client.llen(key).await?;
        Ok(len)
    }

    async fn exec_batch(&self, commands: Vec<StoreCommand>) -> AppResult<()> {
        if commands.is_empty() {
            return Ok(());
        }

        let pipeline = self.client.pipeline();
        for command in commands {
            match command {
                StoreCommand::Del { key } => {
                    pipeline.del::<(), _>(key).await?;
                }
                StoreCommand::ZAdd { key, score, member } => {
                    pipeline
                        .zadd::<(), _, _>(key, None, None, false, false, (score, bytes_value(member)))
                        .await?;
                }
                StoreCommand::ZRem { key, members } => {
                    let members: Vec<Value> = members.into_iter().map(bytes_value).collect();
                    pipeline.zrem::<(), _, _>(key, members).await?;
                }
                StoreCommand::LPush { key, value } => {
                    pipeline.lpush::<(), _, _>(key, bytes_value(value)).await?;
                }
            }
        }

        let _: Value = pipeline.all().await?;
        Ok(())
    }
}
