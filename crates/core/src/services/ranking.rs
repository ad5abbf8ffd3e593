//! Hot list ranking.
//!
//! The hot list is a sorted set of post ids in the fast store, scored by
//! [`score`]. It is derived state: cold start rebuilds it from the database
//! and every counter mutation re-scores the affected post.

use std::sync::Arc;

use hollow_common::config::RankingConfig;
use hollow_common::{AppResult, FastStore, Keyspace, StoreCommand, SystemLoad};
use hollow_db::entities::post;
use hollow_db::repositories::PostRepository;
use tracing::{debug, info, warn};

/// Hot score of a post: popularity plus a slowly growing recency term, minus
/// a penalty for reports.
#[must_use]
pub fn score(post: &post::Model) -> f64 {
    f64::from(post.like_num) * 3.0 + f64::from(post.reply_num) - f64::from(post.report_num) * 10.0
        + post.created_at.timestamp() as f64 / 1800.0
}

/// Outcome of a cold start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColdStart {
    /// The hot list was rebuilt with this many posts.
    Loaded(usize),
    /// The host was too busy; the hot list was left as it was.
    Skipped {
        /// Load figure that caused the skip, if one could be read.
        load: Option<f64>,
    },
}

fn member(post_id: i32) -> Vec<u8> {
    post_id.to_string().into_bytes()
}

fn parse_member(bytes: &[u8]) -> Option<i32> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Hot list maintenance and reads.
#[derive(Clone)]
pub struct RankingCache {
    store: Arc<dyn FastStore>,
    keys: Keyspace,
    post_repo: PostRepository,
    load: Arc<dyn SystemLoad>,
    config: RankingConfig,
}

impl RankingCache {
    /// Create a new ranking cache.
    #[must_use]
    pub fn new(
        store: Arc<dyn FastStore>,
        keys: Keyspace,
        post_repo: PostRepository,
        load: Arc<dyn SystemLoad>,
        config: RankingConfig,
    ) -> Self {
        Self {
            store,
            keys,
            post_repo,
            load,
            config,
        }
    }

    /// Rebuild the hot list from the database unless the host is busy.
    pub async fn cold_start(&self) -> AppResult<ColdStart> {
        let load = match self.load.load_average().await {
            Ok(load) => load,
            Err(e) => {
                warn!(error = %e, "Could not read system load, skipping hot list cold start");
                return Ok(ColdStart::Skipped { load: None });
            }
        };

        if load > self.config.load_threshold {
            info!(
                load,
                threshold = self.config.load_threshold,
                "System load too high, skipping hot list cold start"
            );
            return Ok(ColdStart::Skipped { load: Some(load) });
        }

        let posts = self.post_repo.find_hot(self.config.cold_start_limit).await?;
        let key = self.keys.hot_list();

        let mut commands = Vec::with_capacity(posts.len() + 1);
        commands.push(StoreCommand::Del { key: key.clone() });
        commands.extend(posts.iter().map(|post| StoreCommand::ZAdd {
            key: key.clone(),
            score: score(post),
            member: member(post.id),
        }));
        self.store.exec_batch(commands).await?;

        info!(count = posts.len(), "Hot list rebuilt");
        Ok(ColdStart::Loaded(posts.len()))
    }

    /// Re-score a post from its current row.
    ///
    /// A post that no longer exists (or is deleted) is removed from the hot
    /// list instead; that is not an error.
    pub async fn update_score(&self, post_id: i32) -> AppResult<()> {
        match self.post_repo.find_live_by_id(post_id).await? {
            Some(post) => {
                let score = score(&post);
                self.store
                    .zadd(&self.keys.hot_list(), score, member(post_id))
                    .await?;
                debug!(post_id, score, "Hot score updated");
            }
            None => {
                self.remove(post_id).await?;
                debug!(post_id, "Post gone, removed from hot list");
            }
        }
        Ok(())
    }

    /// Remove a post from the hot list.
    pub async fn remove(&self, post_id: i32) -> AppResult<()> {
        self.store.zrem(&self.keys.hot_list(), member(post_id)).await
    }

    /// Post ids on a 1-based page of the hot list, highest score first.
    pub async fn page(&self, page: u32, page_size: u32) -> AppResult<Vec<i32>> {
        if page == 0 || page_size == 0 {
            return Ok(vec![]);
        }

        let start = i64::from(page - 1) * i64::from(page_size);
        let stop = start + i64::from(page_size) - 1;

        let members = self
            .store
            .zrevrange(&self.keys.hot_list(), start, stop)
            .await?;

        Ok(members
            .iter()
            .filter_map(|bytes| {
                let id = parse_member(bytes);
                if id.is_none() {
                    warn!(member = ?bytes, "Ignoring malformed hot list member");
                }
                id
            })
            .collect())
    }

    /// A page of hot posts, hydrated from the database in ranking order.
    pub async fn hot_posts(&self, page: u32, page_size: u32) -> AppResult<Vec<post::Model>> {
        let ids = self.page(page, page_size).await?;
        self.post_repo.find_by_ids_in_order(&ids).await
    }
}
