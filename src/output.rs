//! Console sink: prints summaries, errors and the final tally.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use userfeed_core::contract::{EnrichedSummary, ErrorTally, PipelineError, Sink};

pub const BANNER: &str = "===== Aggregated Data =====";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned one-line-per-user table.
    #[default]
    Table,
    /// One JSON object per line.
    Json,
}

type Writer = Mutex<Box<dyn Write + Send>>;

/// Summaries and the tally go to `out`, errors to `err`.
pub struct ConsoleSink {
    format: OutputFormat,
    banner_printed: AtomicBool,
    out: Writer,
    err: Writer,
}

impl ConsoleSink {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writers(
            format,
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
        )
    }

    pub fn with_writers(
        format: OutputFormat,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            format,
            banner_printed: AtomicBool::new(false),
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    /// Table mode prints the banner exactly once, before the first summary or the tally.
    fn banner(&self) {
        if self.format == OutputFormat::Table && !self.banner_printed.swap(true, Ordering::Relaxed) {
            emit(&self.out, "stdout", BANNER);
        }
    }
}

/// Write failures (a closed pipe, say) are logged and the run carries on.
fn emit(writer: &Writer, stream: &'static str, line: &str) {
    let mut writer = match writer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
        tracing::error!(stream, error = %e, "Failed to write output line");
    }
}

pub fn format_summary(summary: &EnrichedSummary) -> String {
    format!(
        "User: {:<20} | Posts: {} | Albums: {} | Todos: {} ({} done) | Comments: {} | Photos: {}",
        summary.name,
        summary.post_count,
        summary.album_count,
        summary.todo_count,
        summary.completed_todo_count,
        summary.comment_count,
        summary.photo_count,
    )
}

pub fn format_error(error: &PipelineError) -> String {
    format!(
        "{} ERROR in {}: {} (at {})",
        error.stage().as_str().to_uppercase(),
        error.source_id,
        error.failure,
        error.timestamp.to_rfc3339(),
    )
}

impl Sink for ConsoleSink {
    fn summary(&self, summary: &EnrichedSummary) {
        match self.format {
            OutputFormat::Table => {
                self.banner();
                emit(&self.out, "stdout", &format_summary(summary));
            }
            OutputFormat::Json => match serde_json::to_string(summary) {
                Ok(line) => emit(&self.out, "stdout", &line),
                Err(e) => {
                    tracing::error!(error = ?e, user_id = summary.user_id, "Failed to serialise summary")
                }
            },
        }
    }

    fn error(&self, error: &PipelineError) {
        emit(&self.err, "stderr", &format_error(error));
    }

    fn tally(&self, tally: &ErrorTally) {
        match self.format {
            OutputFormat::Table => {
                self.banner();
                emit(&self.out, "stdout", &format!("Total fetch errors: {}", tally.retrieval));
                emit(&self.out, "stdout", &format!("Total parse errors: {}", tally.parse));
            }
            OutputFormat::Json => match serde_json::to_string(tally) {
                Ok(line) => emit(&self.out, "stdout", &line),
                Err(e) => tracing::error!(error = ?e, "Failed to serialise tally"),
            },
        }
    }
}
