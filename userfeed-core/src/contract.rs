//! # contract: message shapes and pluggable capabilities
//!
//! This module defines what flows between pipeline stages and the two traits
//! through which the pipeline touches the outside world:
//!
//! - [`Fetcher`]: given a source identifier, produce raw bytes or a [`FetchError`].
//! - [`Sink`]: receive finished summaries, errors as they occur, and the final tally.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so consumers can generate
//!   deterministic mocks for unit/integration tests (`MockFetcher`, `MockSink`).
//!
//! ## Adding New Transports
//! - Implement [`Fetcher`] for the transport. Map every failure to a
//!   [`FetchError`] variant; the retrieval stage applies its own deadline on top.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;

pub use crate::enrich::EnrichedSummary;
pub use crate::error::{FetchError, PipelineError};
pub use crate::records::Records;
pub use crate::registry::RecordKind;
pub use crate::report::ErrorTally;

/// Bytes retrieved for one source. Owned by the parse stage once sent.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub source_id: String,
    pub bytes: Vec<u8>,
}

/// Records decoded from one payload. Consumed exactly once by aggregation.
#[derive(Debug, Clone)]
pub struct ParsedBatch {
    pub source_id: String,
    pub kind: RecordKind,
    pub records: Records,
}

/// Retrieval capability. Implemented by the HTTP client and by test doubles.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body for `source_id`, giving up once `deadline` has elapsed.
    async fn fetch(&self, source_id: &str, deadline: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Terminal consumer for pipeline output.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Sink: Send + Sync {
    fn summary(&self, summary: &EnrichedSummary);

    /// Called once per error, as soon as the reporter receives it.
    fn error(&self, error: &PipelineError);

    fn tally(&self, tally: &ErrorTally);
}
