//! Cache-aside reads of comment lists.
//!
//! Only posts younger than the eligibility window are cached. Each cached
//! entry is the full comment list of one post (soft-deleted comments
//! included), stored as JSON with a fixed TTL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hollow_common::config::CommentCacheConfig;
use hollow_common::{AppResult, FastStore, Keyspace};
use hollow_db::entities::{comment, post};
use hollow_db::repositories::CommentRepository;
use tracing::{debug, warn};

/// Comment list cache.
#[derive(Clone)]
pub struct CommentCache {
    store: Arc<dyn FastStore>,
    keys: Keyspace,
    comment_repo: CommentRepository,
    config: CommentCacheConfig,
}

impl CommentCache {
    /// Create a new comment cache.
    #[must_use]
    pub fn new(
        store: Arc<dyn FastStore>,
        keys: Keyspace,
        comment_repo: CommentRepository,
        config: CommentCacheConfig,
    ) -> Self {
        Self {
            store,
            keys,
            comment_repo,
            config,
        }
    }

    /// Whether comments of a post created at `created_at` may be cached at `now`.
    #[must_use]
    pub fn is_eligible(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < created_at + Duration::days(self.config.eligible_days)
    }

    fn post_is_eligible(&self, post: &post::Model, now: DateTime<Utc>) -> bool {
        self.is_eligible(post.created_at.with_timezone(&Utc), now)
    }

    /// Comments of one post, in ID order.
    pub async fn comments(
        &self,
        post: &post::Model,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<comment::Model>> {
        if !self.post_is_eligible(post, now) {
            return self.comment_repo.find_by_post(post.id).await;
        }

        if let Some(cached) = self.read(post.id).await {
            return Ok(cached);
        }

        let comments = self.comment_repo.find_by_post(post.id).await?;
        self.write(post.id, &comments).await;
        Ok(comments)
    }

    /// Comments of several posts, grouped by post ID.
    ///
    /// Cache misses and ineligible posts are fetched together in a single
    /// query. Every requested post has an entry in the result.
    pub async fn comments_of_posts(
        &self,
        posts: &[post::Model],
        now: DateTime<Utc>,
    ) -> AppResult<HashMap<i32, Vec<comment::Model>>> {
        let mut result = HashMap::with_capacity(posts.len());
        let mut misses = Vec::new();
        let mut to_fetch = Vec::new();

        for post in posts {
            if result.contains_key(&post.id) || to_fetch.contains(&post.id) {
                continue;
            }
            if self.post_is_eligible(post, now) {
                match self.read(post.id).await {
                    Some(cached) => {
                        result.insert(post.id, cached);
                    }
                    None => {
                        misses.push(post.id);
                        to_fetch.push(post.id);
                    }
                }
            } else {
                to_fetch.push(post.id);
            }
        }

        if to_fetch.is_empty() {
            return Ok(result);
        }

        let mut fetched = self.comment_repo.find_by_posts(&to_fetch).await?;

        for post_id in misses {
            let comments = fetched.get(&post_id).map_or(&[][..], Vec::as_slice);
            self.write(post_id, comments).await;
        }

        for post_id in to_fetch {
            result.insert(post_id, fetched.remove(&post_id).unwrap_or_default());
        }

        Ok(result)
    }

    /// Drop the cached comment list of a post.
    pub async fn invalidate(&self, post_id: i32) -> AppResult<()> {
        self.store.del(&self.keys.comments(post_id)).await
    }

    /// Cached list of a post. Read and decode failures count as misses.
    async fn read(&self, post_id: i32) -> Option<Vec<comment::Model>> {
        let bytes = match self.store.get(&self.keys.comments(post_id)).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!(post_id, error = %e, "Comment cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(comments) => {
                debug!(post_id, "Comment cache hit");
                Some(comments)
            }
            Err(e) => {
                warn!(post_id, error = %e, "Discarding undecodable comment cache entry");
                None
            }
        }
    }

    /// Store the list of a post. Failures are logged only.
    async fn write(&self, post_id: i32, comments: &[comment::Model]) {
        let bytes = match serde_json::to_vec(comments) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(post_id, error = %e, "Failed to encode comments for cache");
                return;
            }
        };

        if let Err(e) = self
            .store
            .set_ex(&self.keys.comments(post_id), bytes, self.config.ttl())
            .await
        {
            warn!(post_id, error = %e, "Comment cache write failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hollow_common::{AppError, MemoryStore, StoreCommand};
    use sea_orm::{DatabaseBackend, MockDatabase};

    /// Serves reads from memory and rejects every `SET`.
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl FastStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
            self.0.get(key).await
        }

        async fn set_ex(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl: std::time::Duration,
        ) -> AppResult<()> {
            Err(AppError::Redis("READONLY replica".to_string()))
        }

        async fn del(&self, key: &str) -> AppResult<()> {
            self.0.del(key).await
        }

        async fn zadd(&self, key: &str, score: f64, member: Vec<u8>) -> AppResult<()> {
            self.0.zadd(key, score, member).await
        }

        async fn zrem(&self, key: &str, member: Vec<u8>) -> AppResult<()> {
            self.0.zrem(key, member).await
        }

        async fn zscore(&self, key: &str, member: Vec<u8>) -> AppResult<Option<f64>> {
            self.0.zscore(key, member).await
        }

        async fn zrange_by_score(&self, key: &str, max: f64) -> AppResult<Vec<Vec<u8>>> {
            self.0.zrange_by_score(key, max).await
        }

        async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<Vec<u8>>> {
            self.0.zrevrange(key, start, stop).await
        }

        async fn lpush(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
            self.0.lpush(key, value).await
        }

        async fn brpop(&self, key: &str) -> AppResult<Vec<u8>> {
            self.0.brpop(key).await
        }

        async fn llen(&self, key: &str) -> AppResult<u64> {
            self.0.llen(key).await
        }

        async fn exec_batch(&self, commands: Vec<StoreCommand>) -> AppResult<()> {
            self.0.exec_batch(commands).await
        }
    }

    fn test_post(id: i32, created_at: DateTime<Utc>) -> post::Model {
        post::Model {
            id,
            user_id: 1,
            text: String::new(),
            tag: None,
            like_num: 0,
            reply_num: 0,
            report_num: 0,
            distinct_commenter_count: 0,
            created_at: created_at.into(),
            updated_at: created_at.into(),
            deleted_at: None,
        }
    }

    fn test_comment(id: i32, post_id: i32) -> comment::Model {
        comment::Model {
            id,
            post_id,
            user_id: 10,
            reply_to: None,
            text: format!("comment {id}"),
            name: "Alice".to_string(),
            tag: None,
            created_at: Utc::now().into(),
            deleted_at: None,
        }
    }

    fn cache(db: sea_orm::DatabaseConnection, store: Arc<MemoryStore>) -> CommentCache {
        CommentCache::new(
            store,
            Keyspace::default(),
            CommentRepository::new(Arc::new(db)),
            CommentCacheConfig::default(),
        )
    }

    #[test]
    fn test_eligibility_window() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let cache = cache(db, Arc::new(MemoryStore::new()));
        let created = Utc::now();

        assert!(cache.is_eligible(created, created + Duration::days(364)));
        assert!(!cache.is_eligible(created, created + Duration::days(365)));
    }

    #[tokio::test]
    async fn test_single_read_populates_cache() {
        let store = Arc::new(MemoryStore::new());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_comment(1, 5), test_comment(2, 5)]])
            .into_connection();
        let cache = cache(db, store.clone());
        let now = Utc::now();
        let post = test_post(5, now);

        let first = cache.comments(&post, now).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(store.contains_value("hollow:comments:5").unwrap());

        // Second read is served from the cache; the mock has no more results.
        let second = cache.comments(&post, now).await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_failed_cache_write_still_returns_comments() {
        let store = Arc::new(ReadOnlyStore(MemoryStore::new()));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_comment(1, 5)], [test_comment(1, 5)]])
            .into_connection();
        let cache = CommentCache::new(
            store.clone(),
            Keyspace::default(),
            CommentRepository::new(Arc::new(db)),
            CommentCacheConfig::default(),
        );
        let now = Utc::now();
        let post = test_post(5, now);

        let first = cache.comments(&post, now).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, 1);
        assert!(!store.0.contains_value("hollow:comments:5").unwrap());

        // Nothing was cached, so the next read goes back to the database.
        let second = cache.comments(&post, now).await.unwrap();
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_ineligible_post_is_never_cached() {
        let store = Arc::new(MemoryStore::new());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_comment(1, 5)]])
            .into_connection();
        let cache = cache(db, store.clone());
        let now = Utc::now();
        let post = test_post(5, now - Duration::days(400));

        cache.comments(&post, now).await.unwrap();
        assert!(!store.contains_value("hollow:comments:5").unwrap());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_ex(
                "hollow:comments:5",
                b"not json".to_vec(),
                std::time::Duration::from_secs(60),
            )
            .await
            .unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_comment(1, 5)]])
            .into_connection();
        let cache = cache(db, store);
        let now = Utc::now();

        let comments = cache.comments(&test_post(5, now), now).await.unwrap();
        assert_eq!(comments.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_read_issues_one_query() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let cached = vec![test_comment(1, 1)];
        store
            .set_ex(
                "hollow:comments:1",
                serde_json::to_vec(&cached).unwrap(),
                std::time::Duration::from_secs(60),
            )
            .await
            .unwrap();

        let conn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_comment(2, 3)]])
                .into_connection(),
        );
        let comment_cache = CommentCache::new(
            store.clone(),
            Keyspace::default(),
            CommentRepository::new(conn.clone()),
            CommentCacheConfig::default(),
        );

        let posts = [
            test_post(1, now),
            test_post(2, now),
            test_post(3, now - Duration::days(400)),
        ];
        let result = comment_cache.comments_of_posts(&posts, now).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[&1], cached);
        assert!(result[&2].is_empty());
        assert_eq!(result[&3].len(), 1);

        assert!(store.contains_value("hollow:comments:2").unwrap());
        assert!(!store.contains_value("hollow:comments:3").unwrap());

        drop(comment_cache);
        let db = Arc::try_unwrap(conn).ok().unwrap();
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("IN"));
    }

    #[tokio::test]
    async fn test_batch_read_with_repeated_post() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let conn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_comment(1, 5)]])
                .into_connection(),
        );
        let comment_cache = CommentCache::new(
            store.clone(),
            Keyspace::default(),
            CommentRepository::new(conn.clone()),
            CommentCacheConfig::default(),
        );

        let post = test_post(5, now);
        let result = comment_cache
            .comments_of_posts(&[post.clone(), post], now)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[&5].len(), 1);
        assert!(store.contains_value("hollow:comments:5").unwrap());

        drop(comment_cache);
        let db = Arc::try_unwrap(conn).ok().unwrap();
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_ex("hollow:comments:4", b"[]".to_vec(), std::time::Duration::from_secs(60))
            .await
            .unwrap();

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        cache(db, store.clone()).invalidate(4).await.unwrap();

        assert!(!store.contains_value("hollow:comments:4").unwrap());
    }
}
