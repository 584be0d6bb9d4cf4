//! Source registry: which collections exist and what each one decodes into.
//!
//! The registry is built once at startup and only read afterwards, so it is
//! shared between tasks through an `Arc` without locking.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The six record shapes a source can decode into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    User,
    Post,
    Comment,
    Album,
    Photo,
    Todo,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::User,
        RecordKind::Post,
        RecordKind::Comment,
        RecordKind::Album,
        RecordKind::Photo,
        RecordKind::Todo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::User => "user",
            RecordKind::Post => "post",
            RecordKind::Comment => "comment",
            RecordKind::Album => "album",
            RecordKind::Photo => "photo",
            RecordKind::Todo => "todo",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Identifier handed to the fetcher; for HTTP this is the path segment (e.g. `users`).
    pub id: String,
    pub kind: RecordKind,
    /// Human-readable category label.
    #[serde(default)]
    pub label: String,
}

impl SourceDescriptor {
    pub fn new(id: impl Into<String>, kind: RecordKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    descriptors: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Builds a registry, keeping the first descriptor for any repeated id.
    pub fn new(descriptors: Vec<SourceDescriptor>) -> Self {
        let mut unique: Vec<SourceDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if unique.iter().any(|d| d.id == descriptor.id) {
                tracing::warn!(source = %descriptor.id, "Duplicate source id in registry, ignoring");
                continue;
            }
            unique.push(descriptor);
        }
        Self {
            descriptors: unique,
        }
    }

    /// The six standard collections: users, posts, comments, albums, photos, todos.
    pub fn standard() -> Self {
        Self::new(vec![
            SourceDescriptor::new("users", RecordKind::User, "Users"),
            SourceDescriptor::new("posts", RecordKind::Post, "Posts"),
            SourceDescriptor::new("comments", RecordKind::Comment, "Comments"),
            SourceDescriptor::new("albums", RecordKind::Album, "Albums"),
            SourceDescriptor::new("photos", RecordKind::Photo, "Photos"),
            SourceDescriptor::new("todos", RecordKind::Todo, "Todos"),
        ])
    }

    pub fn lookup(&self, id: &str) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    pub fn kind_of(&self, id: &str) -> Option<RecordKind> {
        self.lookup(id).map(|d| d.kind)
    }

    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
