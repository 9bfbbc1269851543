//! Command line argument parsing using clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::PipelineConfig;
use crate::error::{Result, SpillwayError};

/// Spillway - buffered bulk ingestion into a document search backend
#[derive(Parser, Debug, Clone)]
#[command(name = "spillway")]
#[command(about = "Buffered bulk ingestion into a document search backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SpillwayArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl SpillwayArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Commit JSON lines through the pipeline into an in-memory index
    Ingest(IngestArgs),

    /// Print the effective pipeline configuration
    Config(PipelineArgs),
}

/// Pipeline tuning shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// JSON file with a pipeline configuration (durations in milliseconds)
    #[arg(long = "config", env = "SPILLWAY_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Documents per window before it closes
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Milliseconds a window stays open before it closes
    #[arg(long)]
    pub window_timeout_ms: Option<u64>,

    /// Closed windows held while the backend is busy
    #[arg(long)]
    pub pending_capacity: Option<usize>,

    /// Window dispatches allowed in flight at once
    #[arg(long)]
    pub max_in_flight: Option<usize>,
}

impl PipelineArgs {
    /// Load the configuration file, if any, and apply command line overrides.
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config_file {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    SpillwayError::other(format!(
                        "cannot read config file {}: {e}",
                        path.display()
                    ))
                })?;
                PipelineConfig::from_json(&json)?
            }
            None => PipelineConfig::default(),
        };

        if let Some(size) = self.window_size {
            config = config.with_window_size(size);
        }
        if let Some(ms) = self.window_timeout_ms {
            config = config.with_window_timeout(Duration::from_millis(ms));
        }
        if let Some(capacity) = self.pending_capacity {
            config = config.with_pending_capacity(capacity);
        }
        if let Some(max_in_flight) = self.max_in_flight {
            config = config.with_max_in_flight(max_in_flight);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// File with one JSON document per line, or "-" for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: PathBuf,

    /// Target index
    #[arg(short, long)]
    pub index: String,

    /// Document type within the index
    #[arg(short = 't', long)]
    pub doc_type: Option<String>,

    /// Number of stored documents to print after ingestion
    #[arg(long, default_value = "0")]
    pub show: usize,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
