use std::sync::Arc;

use userfeed_core::aggregate::{self, AggregationStore};
use userfeed_core::contract::ParsedBatch;
use userfeed_core::enrich::enrich;
use userfeed_core::error::AggregationAnomaly;
use userfeed_core::records::{Album, Comment, Photo, Post, Records, Todo, User};
use userfeed_core::registry::RecordKind;

fn user(id: u64) -> User {
    User {
        id,
        name: format!("user-{id}"),
        email: format!("user-{id}@example.com"),
    }
}

fn post(id: u64, user_id: u64) -> Post {
    Post {
        id,
        title: format!("post-{id}"),
        body: String::new(),
        user_id,
    }
}

fn comment(id: u64, post_id: u64) -> Comment {
    Comment {
        id,
        name: "author".into(),
        email: "author@example.com".into(),
        body: String::new(),
        post_id,
    }
}

fn album(id: u64, user_id: u64) -> Album {
    Album {
        id,
        title: format!("album-{id}"),
        user_id,
    }
}

fn photo(id: u64, album_id: u64) -> Photo {
    Photo {
        id,
        title: format!("photo-{id}"),
        url: format!("https://img/{id}"),
        thumbnail_url: format!("https://img/t{id}"),
        album_id,
    }
}

fn todo(id: u64, user_id: u64, completed: bool) -> Todo {
    Todo {
        id,
        title: format!("todo-{id}"),
        completed,
        user_id,
    }
}

fn batch(source_id: &str, records: Records) -> ParsedBatch {
    ParsedBatch {
        source_id: source_id.to_string(),
        kind: records.kind(),
        records,
    }
}

#[tokio::test]
async fn test_single_user_with_three_posts() {
    let store = AggregationStore::new();
    store
        .merge(batch("users", Records::Users(vec![user(7)])))
        .await
        .unwrap();
    store
        .merge(batch(
            "posts",
            Records::Posts(vec![post(1, 7), post(2, 7), post(3, 7)]),
        ))
        .await
        .unwrap();

    let summaries = enrich(&store.finish());
    assert_eq!(summaries.len(), 1);
    let s = &summaries[0];
    assert_eq!(s.user_id, 7);
    assert_eq!(s.post_count, 3);
    assert_eq!(s.album_count, 0);
    assert_eq!(s.todo_count, 0);
    assert_eq!(s.completed_todo_count, 0);
    assert_eq!(s.comment_count, 0);
    assert_eq!(s.photo_count, 0);
}

#[tokio::test]
async fn test_transitive_counts_follow_intermediate_records() {
    let store = AggregationStore::new();
    let batches = vec![
        batch("users", Records::Users(vec![user(1), user(2)])),
        batch("posts", Records::Posts(vec![post(10, 1), post(11, 1), post(12, 2)])),
        batch(
            "comments",
            Records::Comments(vec![
                comment(1, 10),
                comment(2, 10),
                comment(3, 11),
                comment(4, 12),
                // Orphan: post 99 does not exist.
                comment(5, 99),
            ]),
        ),
        batch("albums", Records::Albums(vec![album(100, 2)])),
        batch(
            "photos",
            Records::Photos(vec![photo(1, 100), photo(2, 100), photo(3, 100)]),
        ),
        batch(
            "todos",
            Records::Todos(vec![todo(1, 1, true), todo(2, 1, true), todo(3, 2, false)]),
        ),
    ];
    for b in batches {
        store.merge(b).await.unwrap();
    }

    let index = store.finish();
    let summaries = enrich(&index);
    assert_eq!(summaries.len(), 2);

    assert_eq!(summaries[0].user_id, 1);
    assert_eq!(summaries[0].post_count, 2);
    assert_eq!(summaries[0].comment_count, 3);
    assert_eq!(summaries[0].photo_count, 0);
    assert_eq!(summaries[0].completed_todo_count, 2);

    assert_eq!(summaries[1].user_id, 2);
    assert_eq!(summaries[1].post_count, 1);
    assert_eq!(summaries[1].comment_count, 1);
    assert_eq!(summaries[1].album_count, 1);
    assert_eq!(summaries[1].photo_count, 3);
    assert_eq!(summaries[1].todo_count, 1);

    // Orphans stay indexed even though no summary reaches them.
    assert_eq!(index.count(RecordKind::Comment), 5);
    assert_eq!(index.comments_on(99).len(), 1);
}

#[tokio::test]
async fn test_enrichment_is_idempotent() {
    let store = AggregationStore::new();
    store
        .merge(batch("users", Records::Users(vec![user(3), user(1), user(2)])))
        .await
        .unwrap();
    store
        .merge(batch("todos", Records::Todos(vec![todo(1, 2, true)])))
        .await
        .unwrap();

    let index = store.finish();
    let first = enrich(&index);
    let second = enrich(&index);
    assert_eq!(first, second);
    let ids: Vec<u64> = first.iter().map(|s| s.user_id).collect();
    assert_eq!(ids, vec![1, 2, 3], "summaries are ordered by user id");
}

#[tokio::test]
async fn test_kind_mismatch_is_reported_and_not_merged() {
    let store = AggregationStore::new();
    let bad = ParsedBatch {
        source_id: "posts".into(),
        kind: RecordKind::Post,
        records: Records::Todos(vec![todo(1, 1, false)]),
    };

    let err = store.merge(bad).await.unwrap_err();
    assert_eq!(
        err,
        AggregationAnomaly::KindMismatch {
            source_id: "posts".into(),
            declared: RecordKind::Post,
            actual: RecordKind::Todo,
        }
    );
    assert_eq!(store.record_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_user_is_replaced_and_reported() {
    let store = Arc::new(AggregationStore::new());
    let mut renamed = user(1);
    renamed.name = "renamed".into();

    let merged = store
        .merge(batch("users", Records::Users(vec![user(1), user(2), renamed])))
        .await
        .unwrap();
    assert_eq!(merged.records, 3);
    assert_eq!(
        merged.duplicates,
        vec![AggregationAnomaly::DuplicateUser {
            source_id: "users".into(),
            user_id: 1,
        }]
    );

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    tx.send(batch("more-users", Records::Users(vec![user(2)])))
        .await
        .unwrap();
    drop(tx);
    let stats = aggregate::drain(Arc::clone(&store), rx).await;
    assert_eq!(stats.records, 1);
    assert_eq!(stats.replaced, 1);
    assert_eq!(
        stats.anomalies,
        vec![AggregationAnomaly::DuplicateUser {
            source_id: "more-users".into(),
            user_id: 2,
        }]
    );

    let index = Arc::try_unwrap(store).expect("drain released the store").finish();
    assert_eq!(index.count(RecordKind::User), 2);
    assert_eq!(index.user(1).map(|u| u.name.as_str()), Some("renamed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_merges_lose_nothing() {
    const WRITERS: u64 = 16;
    const PER_BATCH: u64 = 250;

    let store = Arc::new(AggregationStore::new());
    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let base = writer * PER_BATCH;
            // Every writer hits the same user buckets to force contention.
            let records = match writer % 4 {
                0 => Records::Posts((0..PER_BATCH).map(|i| post(base + i, i % 5)).collect()),
                1 => Records::Comments((0..PER_BATCH).map(|i| comment(base + i, i % 5)).collect()),
                2 => Records::Photos((0..PER_BATCH).map(|i| photo(base + i, i % 5)).collect()),
                _ => Records::Todos((0..PER_BATCH).map(|i| todo(base + i, i % 5, i % 2 == 0)).collect()),
            };
            store.merge(batch("stress", records)).await.unwrap().records
        }));
    }

    let mut merged = 0;
    for handle in handles {
        merged += handle.await.unwrap();
    }
    assert_eq!(merged as u64, WRITERS * PER_BATCH);

    let store = Arc::try_unwrap(store).expect("all writers joined");
    let index = store.finish();
    let per_kind = WRITERS / 4 * PER_BATCH;
    assert_eq!(index.count(RecordKind::Post) as u64, per_kind);
    assert_eq!(index.count(RecordKind::Comment) as u64, per_kind);
    assert_eq!(index.count(RecordKind::Photo) as u64, per_kind);
    assert_eq!(index.count(RecordKind::Todo) as u64, per_kind);
    assert_eq!(index.record_count() as u64, WRITERS * PER_BATCH);
    assert_eq!(index.posts_of(0).len() as u64, per_kind / 5);
}
