//! High-level pipeline: orchestrates retrieval → parse → aggregation → enrichment.
//!
//! This module wires the stages together for one run:
//!   - Spawns the error reporter first, so failures are reported while the run progresses
//!   - Fans out one fetch per registered source, bounded by a per-request deadline
//!   - Parses payloads on a fixed worker pool
//!   - Drains parsed batches into a fresh [`AggregationStore`]
//!   - Enriches the finished store and hands every summary to the [`Sink`]
//!
//! # Shutdown ordering
//! Each stage closes its output only after its own tasks have joined:
//! retrieval closes the payload queue, the parse pool closes the batch queue
//! and drops the last error sender, aggregation finishes once the batch queue
//! is empty. Enrichment starts only after aggregation and both stage
//! supervisors have returned, and the run ends after the reporter has joined.
//!
//! # Error Handling
//! Fetch and decode failures never abort the run; they are tallied and the
//! run still enriches whatever arrived. `Err` is returned only when a stage
//! task itself fails to join ([`PipelineFault`]).
//!
//! # Navigation
//! - Main entrypoint: [`run_pipeline`]
//! - Output: [`PipelineReport`]

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::aggregate::{self, AggregationStore};
use crate::config::PipelineConfig;
use crate::contract::{Fetcher, Sink};
use crate::enrich::{enrich, EnrichedSummary};
use crate::error::{AggregationAnomaly, PipelineFault};
use crate::parse::{spawn_parse_pool, ParseStats};
use crate::registry::SourceRegistry;
use crate::report::{spawn_error_reporter, ErrorTally};
use crate::retrieval::{spawn_retrieval, RetrievalStats};

/// Everything a run produced.
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub summaries: Vec<EnrichedSummary>,
    pub tally: ErrorTally,
    pub retrieval: RetrievalStats,
    pub parse: ParseStats,
    pub records_indexed: usize,
    pub anomalies: Vec<AggregationAnomaly>,
}

pub async fn run_pipeline(
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
    config: &PipelineConfig,
) -> Result<PipelineReport, PipelineFault> {
    let run_id = Uuid::new_v4();
    let span = info_span!("pipeline", %run_id);
    run(run_id, registry, fetcher, sink, config)
        .instrument(span)
        .await
}

async fn run(
    run_id: Uuid,
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
    config: &PipelineConfig,
) -> Result<PipelineReport, PipelineFault> {
    info!(
        sources = registry.len(),
        parse_workers = config.parse_workers,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        "Starting pipeline run"
    );

    let (err_tx, err_rx) = mpsc::channel((registry.len() * 2).max(1));
    let reporter = spawn_error_reporter(err_rx, Arc::clone(&sink));

    let (raw_rx, retrieval) = spawn_retrieval(
        Arc::clone(&registry),
        fetcher,
        config.request_timeout,
        err_tx.clone(),
    );
    // The parse pool takes the last error sender held here.
    let (parsed_rx, parse) =
        spawn_parse_pool(config.parse_workers, Arc::clone(&registry), raw_rx, err_tx);

    let store = Arc::new(AggregationStore::new());
    let aggregated = aggregate::drain(Arc::clone(&store), parsed_rx).await;

    let retrieval = retrieval.await.map_err(|e| join_fault("retrieval", e))?;
    let parse = parse.await.map_err(|e| join_fault("parse", e))?;

    let index = Arc::try_unwrap(store)
        .map_err(|_| PipelineFault::StoreShared)?
        .finish();
    let records_indexed = index.record_count();
    if records_indexed + aggregated.replaced != parse.records {
        error!(
            parsed = parse.records,
            indexed = records_indexed,
            replaced = aggregated.replaced,
            "Indexed record count differs from parsed record count"
        );
    }

    let summaries = enrich(&index);
    for summary in &summaries {
        sink.summary(summary);
    }

    let tally = reporter
        .await
        .map_err(|e| join_fault("error reporter", e))?;
    sink.tally(&tally);

    if !aggregated.anomalies.is_empty() {
        error!(
            anomalies = aggregated.anomalies.len(),
            "Run finished with aggregation anomalies"
        );
    }
    info!(
        summaries = summaries.len(),
        records_indexed,
        retrieval_errors = tally.retrieval,
        parse_errors = tally.parse,
        "Pipeline run complete"
    );

    Ok(PipelineReport {
        run_id,
        summaries,
        tally,
        retrieval,
        parse,
        records_indexed,
        anomalies: aggregated.anomalies,
    })
}

fn join_fault(stage: &'static str, e: JoinError) -> PipelineFault {
    error!(stage, error = %e, "Stage task failed to join");
    PipelineFault::Join {
        stage,
        reason: e.to_string(),
    }
}
