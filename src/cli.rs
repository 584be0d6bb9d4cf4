///
/// This module implements the CLI interface for userfeed: command parsing,
/// argument validation and the async entrypoint shared by `main` and tests.
///
/// All pipeline logic (stages, store, enrichment) lives in the [`userfeed-core`] crate.
/// This module is strictly CLI glue: it loads config, builds the HTTP fetcher
/// and console sink, and hands them to the core pipeline.
///
/// ## How To Use
/// - For command-line users: use the installed `userfeed` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`userfeed-core`]: ../../userfeed-core/
use crate::fetch::HttpFetcher;
use crate::load_config::{load_or_default, CliConfig};
use crate::output::{ConsoleSink, OutputFormat};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use userfeed_core::pipeline::run_pipeline;

/// CLI for userfeed: fetch collections concurrently and summarise them per user.
#[derive(Parser)]
#[clap(
    name = "userfeed",
    version,
    about = "Fetch user, post, comment, album, photo and todo collections concurrently and summarise them per user"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every source, aggregate the records and print one summary per user
    Run {
        /// Path to the YAML config file (defaults apply when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
        /// Override the number of parse workers
        #[clap(long)]
        workers: Option<usize>,
        /// Override the per-request timeout in milliseconds
        #[clap(long)]
        timeout_ms: Option<u64>,
        /// Output format for summaries
        #[clap(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List the configured sources and the record kind each decodes into
    Sources {
        /// Path to the YAML config file (defaults apply when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run {
            config,
            workers,
            timeout_ms,
            format,
        } => {
            let config = load_or_default(config.as_deref())?;
            let config = apply_overrides(config, workers, timeout_ms)?;
            tracing::info!(command = "run", "Starting pipeline run");

            let pipeline_config = config.pipeline();
            pipeline_config.trace_loaded();
            let fetcher = HttpFetcher::new(&config.base_url, pipeline_config.request_timeout)
                .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;
            let sink = Arc::new(ConsoleSink::new(format));

            let report = match run_pipeline(
                Arc::new(config.registry()),
                Arc::new(fetcher),
                sink,
                &pipeline_config,
            )
            .await
            {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Pipeline run failed");
                    return Err(anyhow::Error::new(e));
                }
            };

            if !report.anomalies.is_empty() {
                for anomaly in &report.anomalies {
                    tracing::error!(command = "run", error = %anomaly, "Aggregation anomaly");
                }
                anyhow::bail!(
                    "Run {} finished with {} aggregation anomalies",
                    report.run_id,
                    report.anomalies.len()
                );
            }

            tracing::info!(
                command = "run",
                run_id = %report.run_id,
                summaries = report.summaries.len(),
                retrieval_errors = report.tally.retrieval,
                parse_errors = report.tally.parse,
                "Pipeline run complete"
            );
            Ok(())
        }
        Commands::Sources { config } => {
            let config = load_or_default(config.as_deref())?;
            for descriptor in config.registry().descriptors() {
                println!(
                    "{:<12} {:<8} {}",
                    descriptor.id, descriptor.kind, descriptor.label
                );
            }
            Ok(())
        }
    }
}

fn apply_overrides(
    mut config: CliConfig,
    workers: Option<usize>,
    timeout_ms: Option<u64>,
) -> Result<CliConfig> {
    if let Some(workers) = workers {
        if workers == 0 {
            anyhow::bail!("--workers must be at least 1");
        }
        config.parse_workers = workers;
    }
    if let Some(timeout_ms) = timeout_ms {
        if timeout_ms == 0 {
            anyhow::bail!("--timeout-ms must be greater than zero");
        }
        config.request_timeout_ms = timeout_ms;
    }
    Ok(config)
}
