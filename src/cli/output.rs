//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cli::args::{OutputFormat, SpillwayArgs};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::metrics::PipelineStats;

/// Result of an `ingest` run.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResult {
    pub index: String,
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub documents_committed: usize,
    /// Documents the backend reports for the index after the drain.
    pub documents_indexed: u64,
    pub duration_ms: u64,
    pub docs_per_second: f64,
    pub pipeline: PipelineStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<Value>,
}

/// Output a command result in the selected format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &SpillwayArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_json<T: Serialize>(result: &T, args: &SpillwayArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &SpillwayArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    match serde_json::to_value(result)? {
        Value::Object(map) => {
            for (key, value) in map {
                print_field(&key, &value, 0);
            }
        }
        other => println!("{other}"),
    }
    Ok(())
}

fn print_field(key: &str, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            println!("{indent}{key}:");
            for (k, v) in map {
                print_field(k, v, depth + 1);
            }
        }
        Value::Array(items) => {
            println!("{indent}{key}: {} item(s)", items.len());
            for item in items {
                println!("{indent}  - {item}");
            }
        }
        Value::Null => println!("{indent}{key}: -"),
        Value::String(s) => println!("{indent}{key}: {s}"),
        other => println!("{indent}{key}: {other}"),
    }
}

/// Output the effective configuration.
pub fn output_config(config: &PipelineConfig, args: &SpillwayArgs) -> Result<()> {
    output_result("Pipeline configuration", config, args)
}
