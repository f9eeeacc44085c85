use criterion::{criterion_group, criterion_main, Criterion};
use pipeplan::advisor::{advise, parse_run_profile, plan_cluster, plan_join};
use pipeplan::core::config::PipelineConfig;
use pipeplan::core::volume::VolumeMetrics;
use pipeplan::dag::standard_pipeline;
use std::hint::black_box;

const PROFILE: &str = r#"
data_date: "2024-01-15"
sources:
  - { name: customer_data,    size_mb: 125.5, rows: 50000 }
  - { name: transaction_data, size_mb: 980.0, rows: 2000000 }
  - { name: product_data,     size_mb: 40.0,  rows: 8000 }
joins:
  - { name: txn_customer, left: transaction_data, right: customer_data }
quality: { completeness: 99.2, accuracy: 98.8, consistency: 97.9, timeliness: 99.1 }
hours_since_update: 2
"#;

fn bench_decisions(c: &mut Criterion) {
    c.bench_function("plan_cluster", |b| {
        b.iter(|| {
            for mb in [10u64, 5_000, 50_000] {
                black_box(plan_cluster(&VolumeMetrics::from_mb(black_box(mb))));
            }
        })
    });
    c.bench_function("plan_join", |b| {
        b.iter(|| black_box(plan_join(black_box(2_000_000), black_box(500), 1_000_000)))
    });
}

fn bench_report(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let profile = parse_run_profile(PROFILE).unwrap();
    c.bench_function("advise", |b| {
        b.iter(|| {
            let report = advise(&profile, &config).unwrap();
            black_box(report.fingerprint().unwrap());
        })
    });
}

fn bench_graph(c: &mut Criterion) {
    let config = PipelineConfig::default();
    c.bench_function("standard_pipeline_order", |b| {
        b.iter(|| {
            let graph = standard_pipeline(&config).unwrap();
            black_box(graph.topological_order().unwrap().len());
        })
    });
}

criterion_group!(benches, bench_decisions, bench_report, bench_graph);
criterion_main!(benches);
