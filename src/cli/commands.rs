//! Command implementations for the Spillway CLI.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::{info, warn};
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::backend::memory::MemoryBackend;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::index::IndexRef;
use crate::query::metadata::StaticMetadataProvider;
use crate::query::spec::QuerySpec;
use crate::query::translate::DefaultQueryTranslator;
use crate::service::SearchService;

/// Execute a CLI command.
pub async fn execute_command(args: SpillwayArgs) -> anyhow::Result<()> {
    match &args.command {
        Command::Ingest(ingest_args) => ingest(ingest_args.clone(), &args).await,
        Command::Config(pipeline_args) => {
            let config = pipeline_args.resolve()?;
            output_config(&config, &args)?;
            Ok(())
        }
    }
}

/// Line counters of one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineCounts {
    pub read: usize,
    pub skipped: usize,
    pub committed: usize,
}

/// Commit every line of the input through the pipeline, drain it and report.
async fn ingest(args: IngestArgs, cli_args: &SpillwayArgs) -> anyhow::Result<()> {
    let config = args.pipeline.resolve()?;
    let backend = Arc::new(MemoryBackend::new());
    backend.create_index(&args.index);

    let service = SearchService::new(
        config,
        backend.clone(),
        Arc::new(StaticMetadataProvider::new()),
        Arc::new(DefaultQueryTranslator),
    )?;
    service.init();

    let index = match &args.doc_type {
        Some(doc_type) => IndexRef::new(args.index.as_str()).with_type(doc_type.as_str()),
        None => IndexRef::new(args.index.as_str()),
    };

    let started = Instant::now();
    let reader = open_input(&args.input).await?;
    let counts = commit_lines(&service, &index, reader).await?;

    service.shutdown().await;
    let elapsed = started.elapsed();
    info!("Ingested {} documents in {elapsed:?}", counts.committed);

    let documents_indexed = service.count(&index, &QuerySpec::new()).await;
    let sample: Vec<Value> = if args.show > 0 {
        service
            .query(&index, &QuerySpec::new().page(0, args.show))
            .await
    } else {
        Vec::new()
    };

    let result = IngestResult {
        index: index.to_string(),
        lines_read: counts.read,
        lines_skipped: counts.skipped,
        documents_committed: counts.committed,
        documents_indexed,
        duration_ms: elapsed.as_millis() as u64,
        docs_per_second: counts.committed as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        pipeline: service.pipeline_stats(),
        sample,
    };
    output_result("Ingestion finished", &result, cli_args)?;
    Ok(())
}

/// Commit each non-blank JSON line of `reader`. Unparsable lines are skipped.
pub async fn commit_lines<R>(
    service: &SearchService,
    index: &IndexRef,
    reader: R,
) -> anyhow::Result<LineCounts>
where
    R: AsyncBufRead + Unpin,
{
    let mut counts = LineCounts::default();
    let mut lines = reader.lines();
    let mut number = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("failed to read line {}", number + 1))?
    {
        number += 1;
        if line.trim().is_empty() {
            continue;
        }
        counts.read += 1;

        match serde_json::from_str::<Value>(&line) {
            Ok(document) => {
                service.commit(index.clone(), &document)?;
                counts.committed += 1;
            }
            Err(e) => {
                warn!("Skipping line {number}: {e}");
                counts.skipped += 1;
            }
        }
    }
    Ok(counts)
}

async fn open_input(path: &Path) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)
        .await
        .with_context(|| format!("cannot open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}
