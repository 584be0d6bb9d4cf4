//! Parse stage: a fixed pool of workers sharing the retrieval queue.
//!
//! Workers pull from one shared receiver, so each payload is taken by exactly
//! one worker and no source is pinned to a worker. Decoding runs on the
//! blocking pool. The supervisor closes the batch queue and drops its error
//! sender only after every worker has seen the retrieval queue closed.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::contract::{ParsedBatch, RawPayload};
use crate::error::{Failure, PipelineError};
use crate::records::decode;
use crate::registry::SourceRegistry;
use crate::report::forward_error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub parsed: usize,
    pub failed: usize,
    /// Total records across all emitted batches.
    pub records: usize,
}

impl ParseStats {
    fn absorb(&mut self, other: ParseStats) {
        self.parsed += other.parsed;
        self.failed += other.failed;
        self.records += other.records;
    }
}

/// Spawns `workers` parse workers (at least one) and their supervisor.
pub fn spawn_parse_pool(
    workers: usize,
    registry: Arc<SourceRegistry>,
    raw_rx: mpsc::Receiver<RawPayload>,
    err_tx: mpsc::Sender<PipelineError>,
) -> (mpsc::Receiver<ParsedBatch>, JoinHandle<ParseStats>) {
    let workers = workers.max(1);
    let (parsed_tx, parsed_rx) = mpsc::channel(registry.len().max(1));
    let input = Arc::new(Mutex::new(raw_rx));

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            tokio::spawn(parse_worker(
                worker_id,
                Arc::clone(&registry),
                Arc::clone(&input),
                parsed_tx.clone(),
                err_tx.clone(),
            ))
        })
        .collect();

    let supervisor = tokio::spawn(async move {
        let mut stats = ParseStats::default();
        for (worker_id, result) in join_all(handles).await.into_iter().enumerate() {
            match result {
                Ok(worker_stats) => stats.absorb(worker_stats),
                Err(e) => error!(worker = worker_id, error = %e, "Parse worker did not complete"),
            }
        }
        drop(parsed_tx);
        drop(err_tx);
        info!(
            parsed = stats.parsed,
            failed = stats.failed,
            records = stats.records,
            "Parse stage complete, batch queue closed"
        );
        stats
    });

    (parsed_rx, supervisor)
}

async fn parse_worker(
    worker_id: usize,
    registry: Arc<SourceRegistry>,
    input: Arc<Mutex<mpsc::Receiver<RawPayload>>>,
    parsed_tx: mpsc::Sender<ParsedBatch>,
    err_tx: mpsc::Sender<PipelineError>,
) -> ParseStats {
    let mut stats = ParseStats::default();
    loop {
        // Lock is released before decoding so other workers can take the next payload.
        let next = input.lock().await.recv().await;
        let Some(RawPayload { source_id, bytes }) = next else {
            break;
        };

        let Some(kind) = registry.kind_of(&source_id) else {
            error!(worker = worker_id, source = %source_id, "Payload from unregistered source");
            stats.failed += 1;
            forward_error(&err_tx, PipelineError::new(source_id, Failure::Unregistered)).await;
            continue;
        };

        let decoded = tokio::task::spawn_blocking(move || decode(kind, &bytes)).await;
        match decoded {
            Ok(Ok(records)) => {
                debug!(
                    worker = worker_id,
                    source = %source_id,
                    kind = %kind,
                    records = records.len(),
                    "Decoded payload"
                );
                let count = records.len();
                let batch = ParsedBatch {
                    source_id: source_id.clone(),
                    kind,
                    records,
                };
                if parsed_tx.send(batch).await.is_err() {
                    error!(worker = worker_id, source = %source_id, "Batch queue closed before delivery");
                    stats.failed += 1;
                    continue;
                }
                stats.parsed += 1;
                stats.records += count;
            }
            Ok(Err(e)) => {
                stats.failed += 1;
                forward_error(&err_tx, PipelineError::new(source_id, e)).await;
            }
            Err(e) => {
                error!(worker = worker_id, source = %source_id, error = %e, "Decode task did not complete");
                stats.failed += 1;
                let failure = Failure::DecodeAborted(e.to_string());
                forward_error(&err_tx, PipelineError::new(source_id, failure)).await;
            }
        }
    }
    debug!(worker = worker_id, "Payload queue drained, parse worker exiting");
    stats
}
