//! Typed record shapes and the structural decoder.
//!
//! Field names follow the upstream JSON (camelCase). Decoding is purely
//! structural: unknown fields are ignored, missing or mistyped fields fail.

use serde::{Deserialize, Serialize};

use crate::registry::RecordKind;

pub type Id = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub user_id: Id,
}

/// A comment on a post; `name`/`email` identify its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub body: String,
    pub post_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: Id,
    pub title: String,
    pub user_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Id,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
    pub album_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Id,
    pub title: String,
    pub completed: bool,
    pub user_id: Id,
}

/// Decoded records of a single kind, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Users(Vec<User>),
    Posts(Vec<Post>),
    Comments(Vec<Comment>),
    Albums(Vec<Album>),
    Photos(Vec<Photo>),
    Todos(Vec<Todo>),
}

impl Records {
    pub fn kind(&self) -> RecordKind {
        match self {
            Records::Users(_) => RecordKind::User,
            Records::Posts(_) => RecordKind::Post,
            Records::Comments(_) => RecordKind::Comment,
            Records::Albums(_) => RecordKind::Album,
            Records::Photos(_) => RecordKind::Photo,
            Records::Todos(_) => RecordKind::Todo,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Records::Users(v) => v.len(),
            Records::Posts(v) => v.len(),
            Records::Comments(v) => v.len(),
            Records::Albums(v) => v.len(),
            Records::Photos(v) => v.len(),
            Records::Todos(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes a JSON array of `kind` records.
pub fn decode(kind: RecordKind, bytes: &[u8]) -> Result<Records, serde_json::Error> {
    Ok(match kind {
        RecordKind::User => Records::Users(serde_json::from_slice(bytes)?),
        RecordKind::Post => Records::Posts(serde_json::from_slice(bytes)?),
        RecordKind::Comment => Records::Comments(serde_json::from_slice(bytes)?),
        RecordKind::Album => Records::Albums(serde_json::from_slice(bytes)?),
        RecordKind::Photo => Records::Photos(serde_json::from_slice(bytes)?),
        RecordKind::Todo => Records::Todos(serde_json::from_slice(bytes)?),
    })
}
