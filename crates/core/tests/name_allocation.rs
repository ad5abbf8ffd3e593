//! Commenter name allocation against a live database.
//!
//! The tests share post 42, so run them serially:
//! `cargo test -p hollow-core --test name_allocation -- --ignored --test-threads=1`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use hollow_core::{CommenterNameAllocator, AUTHOR_NAME};
use hollow_db::entities::{post_commenter, Post, PostCommenter};
use hollow_db::test_utils::TestDatabase;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

async fn setup() -> (TestDatabase, CommenterNameAllocator) {
    let db = TestDatabase::new().await.expect("Failed to set up test database");
    db.cleanup().await.expect("Failed to clean test database");
    db.insert_post(42, 1).await.expect("Failed to insert post");
    let allocator = CommenterNameAllocator::new(db.shared());
    (db, allocator)
}

async fn commenter_count(db: &TestDatabase) -> (i32, u64) {
    let post = Post::find_by_id(42).one(db.connection()).await.unwrap().unwrap();
    let mappings = PostCommenter::find()
        .filter(post_commenter::Column::PostId.eq(42))
        .count(db.connection())
        .await
        .unwrap();
    (post.distinct_commenter_count, mappings)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL"]
async fn test_concurrent_first_comments_get_distinct_names() {
    let (db, allocator) = setup().await;

    let (a, b) = tokio::join!(
        allocator.assign_or_get(42, 1, 100),
        allocator.assign_or_get(42, 1, 200),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a, b);
    let names: HashSet<&str> = [a.as_str(), b.as_str()].into_iter().collect();
    assert_eq!(names, HashSet::from(["Alice", "Bob"]));

    assert_eq!(commenter_count(&db).await, (2, 2));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL"]
async fn test_many_concurrent_commenters_keep_count_in_step() {
    let (db, allocator) = setup().await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.assign_or_get(42, 1, 1000 + i).await })
        })
        .collect();

    let mut names = HashSet::new();
    for task in tasks {
        names.insert(task.await.unwrap().unwrap());
    }

    assert_eq!(names.len(), 20);
    assert_eq!(commenter_count(&db).await, (20, 20));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL"]
async fn test_repeat_and_author_comments_allocate_nothing() {
    let (db, allocator) = setup().await;

    let first = allocator.assign_or_get(42, 1, 7).await.unwrap();
    let again = allocator.assign_or_get(42, 1, 7).await.unwrap();
    let author = allocator.assign_or_get(42, 1, 1).await.unwrap();

    assert_eq!(first, again);
    assert_eq!(author, AUTHOR_NAME);
    assert_eq!(commenter_count(&db).await, (1, 1));
}
