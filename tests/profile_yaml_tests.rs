//! Run profile YAML parsing and the full advice report.

use pipeplan::advisor::{advise, parse_run_profile, CacheLevel, DslError, JoinStrategy, WorkerClass};
use pipeplan::core::config::PipelineConfig;
use pipeplan::core::hash::hash_serde;
use pipeplan::core::manifest::AdviceManifest;
use pipeplan::dag::standard_pipeline;

const DAILY: &str = r#"
data_date: "2024-01-15"
sources:
  - { name: customer_data,    size_mb: 125.5, rows: 50000 }
  - { name: transaction_data, size_mb: 9800.0, rows: 2000000 }
  - { name: product_data,     size_mb: 80.0,  rows: 8000 }
joins:
  - { name: txn_customer, left: transaction_data, right: customer_data }
  - { name: txn_product,  left: product_data,     right: transaction_data }
quality: { completeness: 96.0, accuracy: 92.0, consistency: 91.0, timeliness: 93.0 }
hours_since_update: 2
tuning:
  partition_columns: [processing_date]
  bucket_columns: [customer_id]
  num_buckets: 16
  cache_level: DISK_ONLY
  adaptive_query: true
  coalesce_partitions: 4
  checkpoint_path: s3://data-lake-dev/checkpoints/daily/
profiles:
  transaction_data: { total_rows: 2000000, null_counts: { amount: 150000 }, duplicate_count: 0 }
"#;

#[test]
fn test_daily_profile_report() {
    let profile = parse_run_profile(DAILY).unwrap();
    assert_eq!(profile.tuning.cache_level, CacheLevel::DiskOnly);

    let report = advise(&profile, &PipelineConfig::default()).unwrap();
    // 10005.5 MB in total
    assert_eq!(report.cluster.worker_class, WorkerClass::Large);
    assert_eq!(report.cluster_spec.num_workers, 8);
    assert_eq!(report.cluster_spec.autotermination_minutes, 30);

    assert_eq!(report.joins[0].plan.strategy, JoinStrategy::BroadcastRight);
    assert_eq!(report.joins[1].plan.strategy, JoinStrategy::BroadcastLeft);

    let q = report.quality.as_ref().unwrap();
    assert!((q.composite - 93.0).abs() < 1e-9);
    assert!(q.alert.is_some());

    assert!(report.freshness.unwrap().is_fresh);
    assert_eq!(report.violations["transaction_data"].len(), 1);
    assert_eq!(report.engine_properties["spark.sql.adaptive.enabled"], "true");
    assert_eq!(report.engine_properties["spark.executor.cores"], "8");
}

#[test]
fn test_tuning_reaches_report() {
    let report = advise(&parse_run_profile(DAILY).unwrap(), &PipelineConfig::default()).unwrap();
    let t = &report.tuning;
    assert_eq!(t.partition_columns, vec!["processing_date"]);
    assert_eq!(t.bucketing(), Some((16, &["customer_id".to_string()][..])));
    assert_eq!(t.cache_level, CacheLevel::DiskOnly);
    assert_eq!(t.coalesce_partitions, 4);
    assert_eq!(t.checkpoint_path.as_deref(), Some("s3://data-lake-dev/checkpoints/daily/"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["tuning"]["partition_columns"][0], "processing_date");
    assert_eq!(json["tuning"]["bucket_columns"][0], "customer_id");
    assert_eq!(json["tuning"]["cache_level"], "DISK_ONLY");
    assert_eq!(json["tuning"]["checkpoint_path"], "s3://data-lake-dev/checkpoints/daily/");
}

#[test]
fn test_unknown_fields_rejected() {
    let bad = r#"
sources:
  - { name: a, size_mb: 1.0, rows: 1, colour: blue }
"#;
    assert!(matches!(parse_run_profile(bad), Err(DslError::Yaml(_))));

    for nested in [
        "tuning: { enable_adaptive_query: true }",
        "quality: { completeness: 99, accuracy: 99, consistency: 99, timeliness: 99, freshness: 99 }",
        "weights: { completeness: 1, accuracy: 1, consistency: 1, timeliness: 1, extra: 1 }",
        "profiles: { a: { total_rows: 10, nulls: { x: 1 } } }",
    ] {
        let yaml = format!("sources:\n  - {{ name: a, size_mb: 1.0, rows: 1 }}\n{nested}\n");
        assert!(
            matches!(parse_run_profile(&yaml), Err(DslError::Yaml(_))),
            "accepted: {nested}"
        );
    }
}

#[test]
fn test_semantic_errors_reported() {
    let unknown_join = r#"
sources:
  - { name: a, size_mb: 1.0, rows: 1 }
joins:
  - { name: j, left: a, right: b }
"#;
    assert!(matches!(parse_run_profile(unknown_join), Err(DslError::Invalid(_))));

    let negative = r#"
sources:
  - { name: a, size_mb: -3.0, rows: 1 }
"#;
    assert!(parse_run_profile(negative).is_err());

    let no_sources = "sources: []\n";
    assert!(parse_run_profile(no_sources).is_err());

    let invalid = |yaml: &str| matches!(parse_run_profile(yaml), Err(DslError::Invalid(_)));

    assert!(invalid(
        r#"
sources:
  - { name: a, size_mb: 1.0, rows: 1 }
  - { name: a, size_mb: 2.0, rows: 2 }
"#
    ));
    assert!(invalid(
        r#"
sources:
  - { name: a, size_mb: 1.0, rows: 1 }
  - { name: b, size_mb: 1.0, rows: 1 }
joins:
  - { name: j, left: a, right: b }
  - { name: j, left: b, right: a }
"#
    ));
    assert!(invalid(
        r#"
sources:
  - { name: a, size_mb: 1.0, rows: 1 }
profiles:
  b: { total_rows: 10 }
"#
    ));
    assert!(invalid(
        r#"
sources:
  - { name: "  ", size_mb: 1.0, rows: 1 }
"#
    ));
}

#[test]
fn test_bad_weights_fail_validation() {
    let yaml = r#"
sources:
  - { name: a, size_mb: 1.0, rows: 1 }
quality: { completeness: 90, accuracy: 90, consistency: 90, timeliness: 90 }
weights: { completeness: 1, accuracy: -1, consistency: 1, timeliness: 1 }
"#;
    assert!(matches!(parse_run_profile(yaml), Err(DslError::Invalid(_))));

    let zero = r#"
sources:
  - { name: a, size_mb: 1.0, rows: 1 }
weights: { completeness: 0, accuracy: 0, consistency: 0, timeliness: 0 }
"#;
    assert!(matches!(parse_run_profile(zero), Err(DslError::Invalid(_))));
}

#[test]
fn test_profile_counts_bounded_by_rows() {
    let nulls = r#"
sources:
  - { name: a, size_mb: 1.0, rows: 10 }
profiles:
  a: { total_rows: 10, null_counts: { x: 50 } }
"#;
    assert!(matches!(parse_run_profile(nulls), Err(DslError::Invalid(_))));

    let duplicates = r#"
sources:
  - { name: a, size_mb: 1.0, rows: 10 }
profiles:
  a: { total_rows: 10, duplicate_count: 40 }
"#;
    assert!(matches!(parse_run_profile(duplicates), Err(DslError::Invalid(_))));
}

#[test]
fn test_manifest_ties_report_to_graph() {
    let cfg = PipelineConfig::default();
    let report = advise(&parse_run_profile(DAILY).unwrap(), &cfg).unwrap();
    let graph = standard_pipeline(&cfg).unwrap();

    let m = AdviceManifest::new(report.fingerprint().unwrap(), 1_700_000_000_000)
        .with_graph(graph.shape_hash().unwrap());
    assert_eq!(m.advice_hash, hash_serde(&report).unwrap());
    assert_eq!(m.graph_hash, Some(graph.shape_hash().unwrap()));
}
