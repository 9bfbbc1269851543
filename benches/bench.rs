//! Criterion benchmarks for the Spillway commit and query paths.
//!
//! Covers window accumulation, per-index grouping, end-to-end pipeline
//! throughput against the in-memory backend and query translation.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use tokio::time::Instant;

use spillway::document::DocumentSource;
use spillway::pipeline::dispatcher::group_by_index;
use spillway::pipeline::window::{CommitEntry, WindowAccumulator};
use spillway::prelude::*;
use spillway::query::{FieldKind, TermType};

/// Generate commit entries spread round-robin over `indices` indices.
fn generate_entries(count: usize, indices: usize) -> Vec<CommitEntry> {
    let refs: Vec<IndexRef> = (0..indices)
        .map(|i| IndexRef::new(format!("index-{i}")))
        .collect();

    (0..count)
        .map(|n| {
            let source = DocumentSource::from_value(json!({
                "n": n,
                "device": format!("device-{}", n % 97),
                "reading": n as f64 * 0.25,
            }));
            CommitEntry::new(refs[n % indices].clone(), source)
        })
        .collect()
}

fn bench_window_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_accumulation");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("accept_10k_entries", |b| {
        b.iter_batched(
            || generate_entries(10_000, 4),
            |entries| {
                let mut accumulator = WindowAccumulator::new(1000, Duration::from_secs(3));
                let mut closed = Vec::new();
                let now = Instant::now();
                for entry in entries {
                    accumulator.accept(entry, now, &mut closed);
                }
                black_box(closed.len())
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by_index");

    for indices in [1, 8, 64] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(BenchmarkId::from_parameter(indices), &indices, |b, &indices| {
            b.iter_batched(
                || generate_entries(1000, indices),
                |entries| black_box(group_by_index(entries)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_pipeline_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_throughput");
    group.sample_size(20);

    let rt = tokio::runtime::Runtime::new().unwrap();

    for window_size in [100, 1000] {
        group.throughput(Throughput::Elements(5000));
        group.bench_with_input(
            BenchmarkId::new("commit_and_drain", window_size),
            &window_size,
            |b, &window_size| {
                b.to_async(&rt).iter(|| async move {
                    let pipeline = CommitPipeline::new(
                        PipelineConfig::default().with_window_size(window_size),
                        Arc::new(MemoryBackend::new()),
                    )
                    .unwrap();
                    pipeline.init();
                    for n in 0..5000u64 {
                        let index = if n % 2 == 0 { "even" } else { "odd" };
                        pipeline.commit(index, &json!({ "n": n })).unwrap();
                    }
                    pipeline.shutdown().await;
                    black_box(pipeline.stats().documents_written)
                })
            },
        );
    }

    group.finish();
}

fn bench_query_translation(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_translation");

    let metadata = IndexMetadata::empty("devices")
        .with_field("name", FieldKind::Text)
        .with_field("kind", FieldKind::Keyword);
    let spec = QuerySpec::new()
        .eq("name", json!("door sensor"))
        .eq("kind", json!("sensor"))
        .and("reading", TermType::Btw, json!([10, 20]))
        .and("device", TermType::Like, json!("front-%"))
        .order_by("reading", SortOrder::Desc)
        .page(4, 50);

    group.bench_function("translate_search", |b| {
        b.iter(|| DefaultQueryTranslator.translate(black_box(&spec), black_box(&metadata)))
    });
    group.bench_function("translate_count", |b| {
        b.iter(|| {
            let count_spec = black_box(&spec).for_count();
            DefaultQueryTranslator.translate(&count_spec, &metadata)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_window_accumulation,
    bench_grouping,
    bench_pipeline_throughput,
    bench_query_translation
);

criterion_main!(benches);
