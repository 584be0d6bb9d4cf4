//! Failure taxonomy for the pipeline.
//!
//! Runtime failures at the retrieval and parse stages are carried as data
//! ([`PipelineError`]) and never stop the run. [`AggregationAnomaly`] marks an
//! internal invariant violation and is surfaced separately. [`PipelineFault`]
//! is the only error that makes [`crate::pipeline::run_pipeline`] return `Err`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::records::Id;
use crate::registry::RecordKind;

/// Why a single fetch attempt did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("failed to read response body: {0}")]
    Read(String),
    /// The retrieval task ended without reporting an outcome (panicked or was cancelled).
    #[error("retrieval task aborted: {0}")]
    Aborted(String),
}

/// Underlying cause of a [`PipelineError`]. The variant decides the stage.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    /// The blocking decode task panicked or was cancelled.
    #[error("decode task aborted: {0}")]
    DecodeAborted(String),
    /// A payload arrived for a source the registry does not know.
    #[error("source is not registered")]
    Unregistered,
}

impl Failure {
    pub fn stage(&self) -> Stage {
        match self {
            Failure::Fetch(_) => Stage::Retrieval,
            Failure::Decode(_) | Failure::DecodeAborted(_) | Failure::Unregistered => Stage::Parse,
        }
    }
}

/// Pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Retrieval,
    Parse,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieval => "retrieval",
            Stage::Parse => "parse",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure captured as data and sent down the error channel.
#[derive(Debug, thiserror::Error)]
#[error("{} error in {source_id}: {failure}", .failure.stage())]
pub struct PipelineError {
    pub source_id: String,
    pub failure: Failure,
    pub timestamp: DateTime<Utc>,
}

impl PipelineError {
    pub fn new(source_id: impl Into<String>, failure: impl Into<Failure>) -> Self {
        Self {
            source_id: source_id.into(),
            failure: failure.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.failure.stage()
    }
}

/// Data the store could not index as parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationAnomaly {
    /// The whole batch was rejected.
    #[error("batch from {source_id} declares kind {declared} but carries {actual} records")]
    KindMismatch {
        source_id: String,
        declared: RecordKind,
        actual: RecordKind,
    },
    /// A later user with the same id replaced an earlier one.
    #[error("user {user_id} from {source_id} replaced an earlier user with the same id")]
    DuplicateUser { source_id: String, user_id: Id },
}

/// Orchestration failure: a stage supervisor or the error reporter did not join cleanly.
#[derive(Debug, thiserror::Error)]
pub enum PipelineFault {
    #[error("{stage} task failed to join: {reason}")]
    Join { stage: &'static str, reason: String },
    #[error("aggregation store still shared after all writers joined")]
    StoreShared,
}
