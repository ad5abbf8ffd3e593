//! Per-post pseudonymous commenter names.
//!
//! Every non-author commenter on a post gets a name derived from the order
//! in which they first commented. Allocation is serialized by an exclusive
//! row lock on the post, so the `n`-th distinct commenter always gets the
//! `n`-th name and `post.distinct_commenter_count` always equals the number
//! of mapping rows.

use std::sync::Arc;

use chrono::Utc;
use hollow_common::{AppError, AppResult};
use hollow_db::entities::{post, post_commenter, Post, PostCommenter};
use hollow_db::repositories::PostCommenterRepository;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

/// Display name of the post author in their own thread.
pub const AUTHOR_NAME: &str = "Author";

const GIVEN_NAMES: [&str; 26] = [
    "Alice", "Bob", "Carol", "Dave", "Eve", "Francis", "Grace", "Hans", "Isabella", "Jason",
    "Kate", "Louis", "Margaret", "Nathan", "Olivia", "Paul", "Queen", "Richard", "Susan",
    "Thomas", "Uma", "Vivian", "Winnie", "Xander", "Yasmine", "Zach",
];

const ADJECTIVES: [&str; 26] = [
    "Angry", "Baby", "Crazy", "Diligent", "Excited", "Fat", "Greedy", "Hungry", "Interesting",
    "Jolly", "Kind", "Little", "Magic", "Naive", "Old", "Powerful", "Quiet", "Rich",
    "Superman", "Tough", "Ugly", "Valiant", "Wise", "Young", "Zealous", "Xenial",
];

/// Name of the `n`-th distinct commenter on a post (1-based).
///
/// Unique for every `n >= 1`.
#[must_use]
pub fn commenter_name(n: i32) -> String {
    let given = GIVEN_NAMES.len() as i32;
    let two_axis = given + ADJECTIVES.len() as i32 * given;

    if (1..=given).contains(&n) {
        GIVEN_NAMES[(n - 1) as usize].to_string()
    } else if (given + 1..=two_axis).contains(&n) {
        let k = n - given - 1;
        format!(
            "{} {}",
            ADJECTIVES[(k / given) as usize],
            GIVEN_NAMES[(k % given) as usize]
        )
    } else {
        format!("Commenter {n}")
    }
}

fn db_err(e: DbErr) -> AppError {
    AppError::Database(e.to_string())
}

/// Assigns commenter names.
#[derive(Clone)]
pub struct CommenterNameAllocator {
    db: Arc<DatabaseConnection>,
    commenter_repo: PostCommenterRepository,
}

impl CommenterNameAllocator {
    /// Create a new allocator.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            commenter_repo: PostCommenterRepository::new(db.clone()),
            db,
        }
    }

    /// Name of `commenter_user_id` on `post_id`, allocating one on first use.
    pub async fn assign_or_get(
        &self,
        post_id: i32,
        author_user_id: i32,
        commenter_user_id: i32,
    ) -> AppResult<String> {
        if commenter_user_id == author_user_id {
            return Ok(AUTHOR_NAME.to_string());
        }

        // Mappings never change once created, so this read needs no lock.
        if let Some(existing) = self.commenter_repo.find(post_id, commenter_user_id).await? {
            return Ok(existing.commenter_name);
        }

        self.allocate(post_id, commenter_user_id).await
    }

    async fn allocate(&self, post_id: i32, user_id: i32) -> AppResult<String> {
        // Dropping the transaction without commit rolls it back.
        let txn = self.db.begin().await.map_err(db_err)?;

        let post = Post::find_by_id(post_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(AppError::PostNotFound(post_id))?;

        // A concurrent request from the same user may have won the lock first.
        let existing = PostCommenter::find()
            .filter(post_commenter::Column::PostId.eq(post_id))
            .filter(post_commenter::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if let Some(existing) = existing {
            txn.commit().await.map_err(db_err)?;
            return Ok(existing.commenter_name);
        }

        let next = post.distinct_commenter_count + 1;
        let name = commenter_name(next);

        post_commenter::ActiveModel {
            post_id: Set(post_id),
            user_id: Set(user_id),
            commenter_name: Set(name.clone()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        Post::update_many()
            .col_expr(post::Column::DistinctCommenterCount, Expr::value(next))
            .filter(post::Column::Id.eq(post_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        debug!(post_id, user_id, count = next, name = %name, "Commenter name allocated");
        Ok(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_post(id: i32, count: i32) -> post::Model {
        post::Model {
            id,
            user_id: 1,
            text: String::new(),
            tag: None,
            like_num: 0,
            reply_num: 0,
            report_num: 0,
            distinct_commenter_count: count,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            deleted_at: None,
        }
    }

    fn mapping(post_id: i32, user_id: i32, name: &str) -> post_commenter::Model {
        post_commenter::Model {
            id: 1,
            post_id,
            user_id,
            commenter_name: name.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_name_axes() {
        assert_eq!(commenter_name(1), "Alice");
        assert_eq!(commenter_name(26), "Zach");
        assert_eq!(commenter_name(27), "Angry Alice");
        assert_eq!(commenter_name(53), "Baby Alice");
        assert_eq!(commenter_name(702), "Xenial Zach");
        assert_eq!(commenter_name(703), "Commenter 703");
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<String> = (1..=1000).map(commenter_name).collect();
        assert_eq!(names.len(), 1000);
        assert!(!names.contains(AUTHOR_NAME));
    }

    #[tokio::test]
    async fn test_author_needs_no_store_access() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let allocator = CommenterNameAllocator::new(db.clone());

        let name = allocator.assign_or_get(42, 1, 1).await.unwrap();
        assert_eq!(name, AUTHOR_NAME);

        drop(allocator);
        let db = Arc::try_unwrap(db).ok().unwrap();
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_existing_mapping_fast_path() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[mapping(42, 7, "Carol")]])
                .into_connection(),
        );
        let allocator = CommenterNameAllocator::new(db);

        let name = allocator.assign_or_get(42, 1, 7).await.unwrap();
        assert_eq!(name, "Carol");
    }

    #[tokio::test]
    async fn test_first_comment_allocates_next_name() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // fast path miss
                .append_query_results([Vec::<post_commenter::Model>::new()])
                // locked post
                .append_query_results([[test_post(42, 2)]])
                // re-check under the lock
                .append_query_results([Vec::<post_commenter::Model>::new()])
                // inserted mapping
                .append_query_results([[mapping(42, 7, "Carol")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let allocator = CommenterNameAllocator::new(db.clone());

        let name = allocator.assign_or_get(42, 1, 7).await.unwrap();
        assert_eq!(name, "Carol");

        drop(allocator);
        let db = Arc::try_unwrap(db).ok().unwrap();
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("FOR UPDATE"));
        assert!(log.contains("distinct_commenter_count"));
    }

    #[tokio::test]
    async fn test_same_user_race_reuses_name() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post_commenter::Model>::new()])
                .append_query_results([[test_post(42, 3)]])
                .append_query_results([[mapping(42, 7, "Carol")]])
                .into_connection(),
        );
        let allocator = CommenterNameAllocator::new(db);

        let name = allocator.assign_or_get(42, 1, 7).await.unwrap();
        assert_eq!(name, "Carol");
    }

    #[tokio::test]
    async fn test_missing_post() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post_commenter::Model>::new()])
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );
        let allocator = CommenterNameAllocator::new(db);

        let result = allocator.assign_or_get(42, 1, 7).await;
        assert!(matches!(result, Err(AppError::PostNotFound(42))));
    }
}
