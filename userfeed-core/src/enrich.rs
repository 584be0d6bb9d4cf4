//! Per-user summary statistics over a finished [`AggregatedIndex`].

use serde::Serialize;

use crate::aggregate::AggregatedIndex;
use crate::records::{Id, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedSummary {
    pub user_id: Id,
    pub name: String,
    pub email: String,
    pub post_count: usize,
    pub album_count: usize,
    pub todo_count: usize,
    pub completed_todo_count: usize,
    /// Comments on any of the user's posts.
    pub comment_count: usize,
    /// Photos in any of the user's albums.
    pub photo_count: usize,
}

/// One summary per user, ordered by user id.
pub fn enrich(index: &AggregatedIndex) -> Vec<EnrichedSummary> {
    index
        .users()
        .into_iter()
        .map(|user| summarise(index, user))
        .collect()
}

fn summarise(index: &AggregatedIndex, user: &User) -> EnrichedSummary {
    let posts = index.posts_of(user.id);
    let albums = index.albums_of(user.id);
    let todos = index.todos_of(user.id);

    EnrichedSummary {
        user_id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        post_count: posts.len(),
        album_count: albums.len(),
        todo_count: todos.len(),
        completed_todo_count: todos.iter().filter(|t| t.completed).count(),
        comment_count: posts.iter().map(|p| index.comments_on(p.id).len()).sum(),
        photo_count: albums.iter().map(|a| index.photos_in(a.id).len()).sum(),
    }
}
