#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use userfeed_core::contract::{EnrichedSummary, ErrorTally, Fetcher, PipelineError, Sink};
use userfeed_core::error::{FetchError, Stage};

/// Scripted response for one source.
#[derive(Clone)]
pub enum Scripted {
    Body(Vec<u8>),
    Fail(FetchError),
    /// Sleeps before answering with the body.
    Slow(Duration, Vec<u8>),
}

/// In-memory fetcher answering from a fixed table. Unknown sources fail with HTTP 404.
#[derive(Clone, Default)]
pub struct TableFetcher {
    responses: HashMap<String, Scripted>,
}

impl TableFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source_id: &str, response: Scripted) -> Self {
        self.responses.insert(source_id.to_string(), response);
        self
    }

    pub fn json(self, source_id: &str, value: serde_json::Value) -> Self {
        self.with(source_id, Scripted::Body(value.to_string().into_bytes()))
    }
}

#[async_trait]
impl Fetcher for TableFetcher {
    async fn fetch(&self, source_id: &str, _deadline: Duration) -> Result<Vec<u8>, FetchError> {
        match self.responses.get(source_id) {
            Some(Scripted::Body(bytes)) => Ok(bytes.clone()),
            Some(Scripted::Fail(e)) => Err(e.clone()),
            Some(Scripted::Slow(delay, bytes)) => {
                tokio::time::sleep(*delay).await;
                Ok(bytes.clone())
            }
            None => Err(FetchError::Status(404)),
        }
    }
}

/// One sink callback, in the order it was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Summary,
    Error,
    Tally,
}

/// Sink that records everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    pub summaries: Mutex<Vec<EnrichedSummary>>,
    pub errors: Mutex<Vec<(Stage, String)>>,
    pub tallies: Mutex<Vec<ErrorTally>>,
    pub calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn error_sources(&self, stage: Stage) -> Vec<String> {
        let mut sources: Vec<String> = self
            .errors
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, id)| id.clone())
            .collect();
        sources.sort();
        sources
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Sink for RecordingSink {
    fn summary(&self, summary: &EnrichedSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
        self.calls.lock().unwrap().push(SinkCall::Summary);
    }

    fn error(&self, error: &PipelineError) {
        self.errors
            .lock()
            .unwrap()
            .push((error.stage(), error.source_id.clone()));
        self.calls.lock().unwrap().push(SinkCall::Error);
    }

    fn tally(&self, tally: &ErrorTally) {
        self.tallies.lock().unwrap().push(*tally);
        self.calls.lock().unwrap().push(SinkCall::Tally);
    }
}

pub fn users_json() -> serde_json::Value {
    json!([
        { "id": 1, "name": "Leanne Graham", "email": "Sincere@april.biz", "username": "Bret" },
        { "id": 2, "name": "Ervin Howell", "email": "Shanna@melissa.tv", "username": "Antonette" }
    ])
}

pub fn posts_json() -> serde_json::Value {
    json!([
        { "id": 1, "title": "first", "body": "a", "userId": 1 },
        { "id": 2, "title": "second", "body": "b", "userId": 1 },
        { "id": 3, "title": "third", "body": "c", "userId": 2 }
    ])
}

pub fn comments_json() -> serde_json::Value {
    json!([
        { "id": 1, "name": "c1", "email": "x@y.z", "body": "nice", "postId": 1 },
        { "id": 2, "name": "c2", "email": "x@y.z", "body": "nice", "postId": 1 },
        { "id": 3, "name": "c3", "email": "x@y.z", "body": "nice", "postId": 2 },
        { "id": 4, "name": "c4", "email": "x@y.z", "body": "nice", "postId": 3 }
    ])
}

pub fn albums_json() -> serde_json::Value {
    json!([
        { "id": 10, "title": "holiday", "userId": 1 },
        { "id": 20, "title": "work", "userId": 2 }
    ])
}

pub fn photos_json() -> serde_json::Value {
    json!([
        { "id": 1, "title": "p1", "url": "https://img/1", "thumbnailUrl": "https://img/t1", "albumId": 10 },
        { "id": 2, "title": "p2", "url": "https://img/2", "thumbnailUrl": "https://img/t2", "albumId": 20 },
        { "id": 3, "title": "p3", "url": "https://img/3", "thumbnailUrl": "https://img/t3", "albumId": 20 }
    ])
}

pub fn todos_json() -> serde_json::Value {
    json!([
        { "id": 1, "title": "t1", "completed": true, "userId": 1 },
        { "id": 2, "title": "t2", "completed": false, "userId": 1 },
        { "id": 3, "title": "t3", "completed": false, "userId": 2 }
    ])
}

/// A fetcher serving every standard source successfully.
pub fn full_fetcher() -> TableFetcher {
    TableFetcher::new()
        .json("users", users_json())
        .json("posts", posts_json())
        .json("comments", comments_json())
        .json("albums", albums_json())
        .json("photos", photos_json())
        .json("todos", todos_json())
}
