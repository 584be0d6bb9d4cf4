use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PARSE_WORKERS: usize = 6;

/// Tuning knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Deadline applied independently to each fetch.
    pub request_timeout: Duration,
    /// Size of the parse worker pool. Values below one are treated as one.
    pub parse_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            parse_workers: DEFAULT_PARSE_WORKERS,
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            request_timeout_ms = self.request_timeout.as_millis() as u64,
            parse_workers = self.parse_workers,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}
