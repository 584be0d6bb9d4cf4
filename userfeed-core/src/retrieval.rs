//! Retrieval stage: one task per source, one fetch attempt each.
//!
//! Every source ends in exactly one of two outcomes: a [`RawPayload`] on the
//! returned queue, or a retrieval [`PipelineError`] on the error channel. The
//! queue is sized to the number of sources so producers never wait on it, and
//! it closes only after the supervisor has joined every fetch task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::contract::{Fetcher, RawPayload};
use crate::error::{FetchError, PipelineError};
use crate::registry::SourceRegistry;
use crate::report::forward_error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrievalStats {
    pub fetched: usize,
    pub failed: usize,
}

/// Spawns the fetch tasks and their supervisor.
///
/// Returns the payload queue and the supervisor handle. The supervisor holds
/// the last payload sender and drops it once all fetch tasks have joined.
pub fn spawn_retrieval(
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn Fetcher>,
    request_timeout: Duration,
    err_tx: mpsc::Sender<PipelineError>,
) -> (mpsc::Receiver<RawPayload>, JoinHandle<RetrievalStats>) {
    let (raw_tx, raw_rx) = mpsc::channel(registry.len().max(1));

    let mut source_ids = Vec::with_capacity(registry.len());
    let mut handles = Vec::with_capacity(registry.len());
    for descriptor in registry.descriptors() {
        info!(source = %descriptor.id, kind = %descriptor.kind, "Starting fetch");
        source_ids.push(descriptor.id.clone());
        handles.push(tokio::spawn(fetch_one(
            descriptor.id.clone(),
            Arc::clone(&fetcher),
            request_timeout,
            raw_tx.clone(),
            err_tx.clone(),
        )));
    }

    let supervisor = tokio::spawn(async move {
        let results = join_all(handles).await;
        let mut stats = RetrievalStats::default();
        for (source_id, result) in source_ids.into_iter().zip(results) {
            match result {
                Ok(true) => stats.fetched += 1,
                Ok(false) => stats.failed += 1,
                Err(join_err) => {
                    error!(source = %source_id, error = %join_err, "Fetch task did not complete");
                    stats.failed += 1;
                    let failure = FetchError::Aborted(join_err.to_string());
                    forward_error(&err_tx, PipelineError::new(source_id, failure)).await;
                }
            }
        }
        drop(raw_tx);
        info!(
            fetched = stats.fetched,
            failed = stats.failed,
            "Retrieval stage complete, payload queue closed"
        );
        stats
    });

    (raw_rx, supervisor)
}

/// Runs one fetch attempt. Returns whether a payload was delivered.
async fn fetch_one(
    source_id: String,
    fetcher: Arc<dyn Fetcher>,
    request_timeout: Duration,
    raw_tx: mpsc::Sender<RawPayload>,
    err_tx: mpsc::Sender<PipelineError>,
) -> bool {
    let started = Instant::now();
    let outcome =
        match tokio::time::timeout(request_timeout, fetcher.fetch(&source_id, request_timeout))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(request_timeout)),
        };

    match outcome {
        Ok(bytes) => {
            debug!(
                source = %source_id,
                bytes = bytes.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Fetch succeeded"
            );
            let payload = RawPayload {
                source_id: source_id.clone(),
                bytes,
            };
            if raw_tx.send(payload).await.is_err() {
                error!(source = %source_id, "Payload queue closed before delivery");
                let failure = FetchError::Aborted("payload queue closed".to_string());
                forward_error(&err_tx, PipelineError::new(source_id, failure)).await;
                return false;
            }
            true
        }
        Err(e) => {
            forward_error(&err_tx, PipelineError::new(source_id, e)).await;
            false
        }
    }
}
