//! Error reporting: a single task that drains the error channel.
//!
//! Errors are logged and forwarded to the sink one at a time as they arrive;
//! the tally is only returned once every sender is gone.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::contract::Sink;
use crate::error::{PipelineError, Stage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorTally {
    pub retrieval: usize,
    pub parse: usize,
}

impl ErrorTally {
    pub fn record(&mut self, stage: Stage) {
        match stage {
            Stage::Retrieval => self.retrieval += 1,
            Stage::Parse => self.parse += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.retrieval + self.parse
    }
}

pub fn spawn_error_reporter(
    mut rx: mpsc::Receiver<PipelineError>,
    sink: Arc<dyn Sink>,
) -> JoinHandle<ErrorTally> {
    tokio::spawn(async move {
        let mut tally = ErrorTally::default();
        while let Some(err) = rx.recv().await {
            warn!(
                stage = %err.stage(),
                source = %err.source_id,
                error = %err.failure,
                at = %err.timestamp.to_rfc3339(),
                "Pipeline error"
            );
            tally.record(err.stage());
            sink.error(&err);
        }
        info!(
            retrieval = tally.retrieval,
            parse = tally.parse,
            "Error channel closed"
        );
        tally
    })
}

/// Sends `error` to the reporter; logs instead if the reporter is gone.
pub(crate) async fn forward_error(tx: &mpsc::Sender<PipelineError>, error: PipelineError) {
    if let Err(mpsc::error::SendError(lost)) = tx.send(error).await {
        warn!(
            stage = %lost.stage(),
            source = %lost.source_id,
            error = %lost.failure,
            "Error reporter closed, error not tallied"
        );
    }
}
