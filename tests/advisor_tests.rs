//! Decision-level tests for cluster sizing, join strategy, and quality scoring.

use pipeplan::advisor::{
    plan_cluster, plan_join, DatasetProfile, JoinPlan, JoinSide, QualityAssessment, QualityScores,
    QualityStatus, QualityViolation, QualityWeights, WorkerClass,
};
use pipeplan::core::config::QualityThresholds;
use pipeplan::core::error::Error;
use pipeplan::core::volume::{VolumeMetrics, BYTES_PER_MB};

fn class_for(mb: u64) -> WorkerClass {
    plan_cluster(&VolumeMetrics::from_mb(mb)).worker_class
}

#[test]
fn test_cluster_tier_boundaries() {
    assert_eq!(class_for(0), WorkerClass::Small);
    assert_eq!(class_for(999), WorkerClass::Small);
    assert_eq!(class_for(1_000), WorkerClass::Medium);
    assert_eq!(class_for(9_999), WorkerClass::Medium);
    assert_eq!(class_for(10_000), WorkerClass::Large);
    assert_eq!(class_for(1_000_000), WorkerClass::Large);
}

#[test]
fn test_cluster_tier_shapes() {
    let small = plan_cluster(&VolumeMetrics::from_mb(10));
    assert_eq!(
        (small.worker_count, small.memory_per_executor.to_string(), small.core_count),
        (2, "4g".to_string(), 2)
    );
    let large = plan_cluster(&VolumeMetrics::from_mb(50_000));
    assert_eq!(
        (large.worker_count, large.memory_per_executor.to_string(), large.core_count),
        (8, "16g".to_string(), 8)
    );
}

#[test]
fn test_worker_count_monotone_in_size() {
    let mut last = 0;
    for mb in (0..20_000).step_by(250) {
        let workers = plan_cluster(&VolumeMetrics::from_mb(mb)).worker_count;
        assert!(workers >= last, "{mb} MB dropped from {last} to {workers} workers");
        last = workers;
    }
}

#[test]
fn test_fractional_sizes_do_not_round_across_boundary() {
    let just_under = VolumeMetrics::new(1_000 * BYTES_PER_MB - 1);
    assert_eq!(plan_cluster(&just_under).worker_class, WorkerClass::Small);
    let fractional = VolumeMetrics::from_megabytes(999.999).unwrap();
    assert_eq!(plan_cluster(&fractional).worker_class, WorkerClass::Small);
}

#[test]
fn test_negative_inputs_rejected() {
    assert!(matches!(
        VolumeMetrics::try_from_signed(-1, None),
        Err(Error::Validation(_))
    ));
    assert!(VolumeMetrics::try_from_signed(10, Some(-5)).is_err());
    assert!(VolumeMetrics::from_megabytes(-0.5).is_err());
    assert!(VolumeMetrics::from_megabytes(f64::NAN).is_err());
}

#[test]
fn test_join_strategies() {
    let t = 1_000_000;
    assert_eq!(plan_join(2_000_000, 500, t), JoinPlan::broadcast(JoinSide::Right));
    assert_eq!(plan_join(500, 2_000_000, t), JoinPlan::broadcast(JoinSide::Left));
    assert_eq!(plan_join(2_000_000, 2_000_000, t), JoinPlan::shuffle());
    assert_eq!(plan_join(1_500_000, 1_800_000, t), JoinPlan::shuffle());
    assert_eq!(plan_join(500, 500, t), JoinPlan::shuffle());
}

#[test]
fn test_broadcast_side_matches_strategy() {
    for (l, r) in [(1, 2), (2, 1), (5, 5), (0, 3_000_000), (3_000_000, 999_999)] {
        let plan = plan_join(l, r, 1_000_000);
        assert_eq!(plan.is_broadcast(), plan.broadcast_side.is_some());
    }
}

#[test]
fn test_decisions_are_idempotent() {
    let v = VolumeMetrics::from_mb(4_321);
    assert_eq!(plan_cluster(&v), plan_cluster(&v));
    assert_eq!(plan_join(7, 9, 100), plan_join(7, 9, 100));
}

#[test]
fn test_composite_is_mean() {
    let scores = QualityScores::new(99.2, 98.8, 97.9, 99.1).unwrap();
    assert!((scores.composite() - 98.75).abs() < 1e-9);

    let uniform = scores.weighted(&QualityWeights::default()).unwrap();
    assert!((uniform - scores.composite()).abs() < 1e-9);
}

#[test]
fn test_weighted_score_and_bad_weights() {
    let scores = QualityScores::new(100.0, 80.0, 80.0, 80.0).unwrap();
    let w = QualityWeights {
        completeness: 2.0,
        accuracy: 1.0,
        consistency: 1.0,
        timeliness: 0.0,
    };
    assert!((scores.weighted(&w).unwrap() - 90.0).abs() < 1e-9);

    let zero = QualityWeights {
        completeness: 0.0,
        accuracy: 0.0,
        consistency: 0.0,
        timeliness: 0.0,
    };
    assert!(scores.weighted(&zero).is_err());
    assert!(QualityScores::new(101.0, 90.0, 90.0, 90.0).is_err());
}

#[test]
fn test_status_levels() {
    let t = QualityThresholds::default();
    let assess = |v: f64| QualityAssessment::assess(QualityScores::new(v, v, v, v).unwrap(), None, &t).unwrap();

    let top = assess(95.0);
    assert_eq!(top.status, QualityStatus::Success);
    assert!(top.alert.is_none());

    let mid = assess(90.0);
    assert_eq!(mid.status, QualityStatus::SuccessWithWarnings);
    assert!(mid.alert.is_some());

    assert_eq!(assess(89.9).status, QualityStatus::CompletedWithIssues);
}

#[test]
fn test_dataset_profile_violations() {
    let t = QualityThresholds::default();
    let clean = DatasetProfile::new(10_000).with_nulls("email", 500).with_duplicates(100);
    assert!(clean.violations(&t).is_empty());

    let dirty = DatasetProfile::new(10_000).with_nulls("email", 501).with_duplicates(101);
    let v = dirty.violations(&t);
    assert_eq!(v.len(), 2);
    assert!(matches!(v[0], QualityViolation::NullPercentageExceeded { .. }));
    assert!(matches!(v[1], QualityViolation::DuplicatePercentageExceeded { .. }));
}
