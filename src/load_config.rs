/// `load_config` module: loads the YAML run configuration and adapts it into core types.
///
/// This module is the only place where user-supplied YAML is parsed and mapped
/// to the strongly-typed [`PipelineConfig`] and [`SourceRegistry`].
///
/// # Responsibilities
/// - Parse the YAML file into [`CliConfig`], filling defaults for anything omitted
/// - Apply environment overrides (`USERFEED_BASE_URL`)
/// - Reject values the pipeline cannot run with (zero timeout, zero workers)
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};
use userfeed_core::config::{PipelineConfig, DEFAULT_PARSE_WORKERS, DEFAULT_REQUEST_TIMEOUT};
use userfeed_core::registry::{SourceDescriptor, SourceRegistry};

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
pub const BASE_URL_ENV: &str = "USERFEED_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_parse_workers")]
    pub parse_workers: usize,
    /// `None` selects the six standard collections; an explicit empty list means no sources.
    #[serde(default)]
    pub sources: Option<Vec<SourceDescriptor>>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_parse_workers() -> usize {
    DEFAULT_PARSE_WORKERS
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            parse_workers: default_parse_workers(),
            sources: None,
        }
    }
}

impl CliConfig {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            parse_workers: self.parse_workers,
        }
    }

    pub fn registry(&self) -> SourceRegistry {
        match &self.sources {
            Some(sources) => SourceRegistry::new(sources.clone()),
            None => SourceRegistry::standard(),
        }
    }

    /// Applies environment overrides and validates the result.
    fn finalise(mut self) -> Result<Self> {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                info!(base_url = %base_url, "Base URL overridden from environment");
                self.base_url = base_url;
            }
        }
        if self.request_timeout_ms == 0 {
            error!("request_timeout_ms must be greater than zero");
            anyhow::bail!("request_timeout_ms must be greater than zero");
        }
        if self.parse_workers == 0 {
            error!("parse_workers must be at least 1");
            anyhow::bail!("parse_workers must be at least 1");
        }
        info!(
            base_url = %self.base_url,
            request_timeout_ms = self.request_timeout_ms,
            parse_workers = self.parse_workers,
            sources = self.sources.as_ref().map(Vec::len),
            "Config loaded and merged successfully"
        );
        Ok(self)
    }
}

/// Loads a YAML config file and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid config with every default.
    let config: CliConfig = if config_content.trim().is_empty() {
        CliConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    config.finalise()
}

/// Loads `path` if given, otherwise starts from defaults; environment overrides apply either way.
pub fn load_or_default(path: Option<&Path>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            info!("No config file given, using defaults");
            CliConfig::default().finalise()
        }
    }
}
