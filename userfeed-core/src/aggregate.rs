//! Aggregation store: per-index locked maps keyed by foreign id.
//!
//! Each index has its own `RwLock`, so batches of different kinds merge in
//! parallel while appends to one index are serialised. Merging only appends,
//! except that a user replaces an earlier user with the same id. Once every
//! writer is done the store is consumed by [`AggregationStore::finish`] into a
//! lock-free [`AggregatedIndex`] for enrichment.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::contract::ParsedBatch;
use crate::error::AggregationAnomaly;
use crate::records::{Album, Comment, Id, Photo, Post, Records, Todo, User};
use crate::registry::RecordKind;

#[derive(Debug, Default)]
pub struct AggregationStore {
    users: RwLock<HashMap<Id, User>>,
    posts_by_user: RwLock<HashMap<Id, Vec<Post>>>,
    comments_by_post: RwLock<HashMap<Id, Vec<Comment>>>,
    albums_by_user: RwLock<HashMap<Id, Vec<Album>>>,
    photos_by_album: RwLock<HashMap<Id, Vec<Photo>>>,
    todos_by_user: RwLock<HashMap<Id, Vec<Todo>>>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one batch into the index for its kind.
    ///
    /// A batch whose declared kind does not match its records is rejected as
    /// an anomaly and nothing is merged. Users replacing an earlier user with
    /// the same id are merged and reported in [`Merged::duplicates`].
    pub async fn merge(&self, batch: ParsedBatch) -> Result<Merged, AggregationAnomaly> {
        let actual = batch.records.kind();
        if actual != batch.kind {
            return Err(AggregationAnomaly::KindMismatch {
                source_id: batch.source_id,
                declared: batch.kind,
                actual,
            });
        }

        let mut duplicates = Vec::new();
        let records = match batch.records {
            Records::Users(users) => {
                let count = users.len();
                let mut index = self.users.write().await;
                for user in users {
                    let user_id = user.id;
                    if index.insert(user_id, user).is_some() {
                        duplicates.push(AggregationAnomaly::DuplicateUser {
                            source_id: batch.source_id.clone(),
                            user_id,
                        });
                    }
                }
                count
            }
            Records::Posts(posts) => append(&self.posts_by_user, posts, |p| p.user_id).await,
            Records::Comments(comments) => {
                append(&self.comments_by_post, comments, |c| c.post_id).await
            }
            Records::Albums(albums) => append(&self.albums_by_user, albums, |a| a.user_id).await,
            Records::Photos(photos) => append(&self.photos_by_album, photos, |p| p.album_id).await,
            Records::Todos(todos) => append(&self.todos_by_user, todos, |t| t.user_id).await,
        };
        debug!(
            source = %batch.source_id,
            kind = %actual,
            records,
            duplicates = duplicates.len(),
            "Merged batch"
        );
        Ok(Merged {
            records,
            duplicates,
        })
    }

    /// Number of records currently indexed for `kind`.
    pub async fn count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::User => self.users.read().await.len(),
            RecordKind::Post => bucket_total(&*self.posts_by_user.read().await),
            RecordKind::Comment => bucket_total(&*self.comments_by_post.read().await),
            RecordKind::Album => bucket_total(&*self.albums_by_user.read().await),
            RecordKind::Photo => bucket_total(&*self.photos_by_album.read().await),
            RecordKind::Todo => bucket_total(&*self.todos_by_user.read().await),
        }
    }

    pub async fn record_count(&self) -> usize {
        let mut total = 0;
        for kind in RecordKind::ALL {
            total += self.count(kind).await;
        }
        total
    }

    /// Consumes the store. Owning `self` guarantees no merge is in flight.
    pub fn finish(self) -> AggregatedIndex {
        AggregatedIndex {
            users: self.users.into_inner(),
            posts_by_user: self.posts_by_user.into_inner(),
            comments_by_post: self.comments_by_post.into_inner(),
            albums_by_user: self.albums_by_user.into_inner(),
            photos_by_album: self.photos_by_album.into_inner(),
            todos_by_user: self.todos_by_user.into_inner(),
        }
    }
}

async fn append<T>(
    index: &RwLock<HashMap<Id, Vec<T>>>,
    records: Vec<T>,
    foreign_key: impl Fn(&T) -> Id,
) -> usize {
    let count = records.len();
    let mut index = index.write().await;
    for record in records {
        index.entry(foreign_key(&record)).or_default().push(record);
    }
    count
}

/// Result of merging one accepted batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Merged {
    /// Records taken from the batch, replaced users included.
    pub records: usize,
    pub duplicates: Vec<AggregationAnomaly>,
}

fn bucket_total<T>(index: &HashMap<Id, Vec<T>>) -> usize {
    index.values().map(Vec::len).sum()
}

/// Outcome of draining the batch queue.
#[derive(Debug, Default)]
pub struct AggregateStats {
    pub batches: usize,
    pub records: usize,
    /// Records merged but no longer indexed because a later one replaced them.
    pub replaced: usize,
    pub anomalies: Vec<AggregationAnomaly>,
}

/// Merges every batch from `rx` into `store` until the queue closes.
pub async fn drain(store: Arc<AggregationStore>, mut rx: mpsc::Receiver<ParsedBatch>) -> AggregateStats {
    let mut stats = AggregateStats::default();
    while let Some(batch) = rx.recv().await {
        match store.merge(batch).await {
            Ok(merged) => {
                stats.batches += 1;
                stats.records += merged.records;
                stats.replaced += merged.duplicates.len();
                for duplicate in merged.duplicates {
                    warn!(error = %duplicate, "Aggregation anomaly: record replaced");
                    stats.anomalies.push(duplicate);
                }
            }
            Err(anomaly) => {
                error!(error = %anomaly, "Aggregation anomaly: batch rejected");
                stats.anomalies.push(anomaly);
            }
        }
    }
    info!(
        batches = stats.batches,
        records = stats.records,
        replaced = stats.replaced,
        anomalies = stats.anomalies.len(),
        "Batch queue drained"
    );
    stats
}

/// Read-only view of a finished store.
#[derive(Debug, Clone, Default)]
pub struct AggregatedIndex {
    users: HashMap<Id, User>,
    posts_by_user: HashMap<Id, Vec<Post>>,
    comments_by_post: HashMap<Id, Vec<Comment>>,
    albums_by_user: HashMap<Id, Vec<Album>>,
    photos_by_album: HashMap<Id, Vec<Photo>>,
    todos_by_user: HashMap<Id, Vec<Todo>>,
}

impl AggregatedIndex {
    /// Users ordered by id.
    pub fn users(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| u.id);
        users
    }

    pub fn user(&self, id: Id) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn posts_of(&self, user_id: Id) -> &[Post] {
        bucket(&self.posts_by_user, user_id)
    }

    pub fn comments_on(&self, post_id: Id) -> &[Comment] {
        bucket(&self.comments_by_post, post_id)
    }

    pub fn albums_of(&self, user_id: Id) -> &[Album] {
        bucket(&self.albums_by_user, user_id)
    }

    pub fn photos_in(&self, album_id: Id) -> &[Photo] {
        bucket(&self.photos_by_album, album_id)
    }

    pub fn todos_of(&self, user_id: Id) -> &[Todo] {
        bucket(&self.todos_by_user, user_id)
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::User => self.users.len(),
            RecordKind::Post => bucket_total(&self.posts_by_user),
            RecordKind::Comment => bucket_total(&self.comments_by_post),
            RecordKind::Album => bucket_total(&self.albums_by_user),
            RecordKind::Photo => bucket_total(&self.photos_by_album),
            RecordKind::Todo => bucket_total(&self.todos_by_user),
        }
    }

    pub fn record_count(&self) -> usize {
        RecordKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }
}

fn bucket<T>(index: &HashMap<Id, Vec<T>>, key: Id) -> &[T] {
    index.get(&key).map(Vec::as_slice).unwrap_or(&[])
}
