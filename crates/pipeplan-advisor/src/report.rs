//! Run every decision once and bundle the results.
//!
//! The report is the plain structured value the scheduler passes downstream.
//! It carries a stable fingerprint so two runs over the same inputs can be
//! shown to have made the same decisions.

use std::collections::BTreeMap;

use pipeplan_core::config::PipelineConfig;
use pipeplan_core::hash::{hash_serde, Hash256};
use pipeplan_core::volume::VolumeMetrics;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::{plan_cluster, ClusterPlan, ClusterSpec};
use crate::dsl::yaml::{DslError, RunProfile};
use crate::freshness::{check_freshness, Freshness};
use crate::join::{plan_join, JoinPlan};
use crate::quality::{QualityAssessment, QualityViolation};
use crate::session::JobTuning;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinAdvice {
    pub name: String,
    pub left: String,
    pub right: String,
    pub left_rows: u64,
    pub right_rows: u64,
    pub threshold: u64,
    pub plan: JoinPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceReport {
    pub data_date: Option<String>,
    pub volume: VolumeMetrics,
    pub cluster: ClusterPlan,
    pub cluster_spec: ClusterSpec,
    pub joins: Vec<JoinAdvice>,
    pub quality: Option<QualityAssessment>,
    /// Profile violations per source; sources without violations are omitted.
    pub violations: BTreeMap<String, Vec<QualityViolation>>,
    pub freshness: Option<Freshness>,
    /// Layout and caching the job applies when writing its outputs.
    pub tuning: JobTuning,
    /// Cluster-implied and tuning properties merged, tuning last.
    pub engine_properties: BTreeMap<String, String>,
}

impl AdviceReport {
    /// blake3 over the canonical JSON form.
    pub fn fingerprint(&self) -> pipeplan_core::error::Result<Hash256> {
        hash_serde(self)
    }

    pub fn has_findings(&self) -> bool {
        !self.violations.is_empty()
            || self.quality.as_ref().is_some_and(|q| q.alert.is_some())
            || self.freshness.is_some_and(|f| !f.is_fresh)
    }
}

pub fn advise(profile: &RunProfile, config: &PipelineConfig) -> Result<AdviceReport, DslError> {
    profile.validate()?;

    let sources = profile.source_stats(config)?;
    let volume = VolumeMetrics::from_sources(&sources);
    let cluster = plan_cluster(&volume);
    let cluster_spec = cluster.to_cluster_spec(&config.cluster);

    let mut joins = Vec::with_capacity(profile.joins.len());
    for j in &profile.joins {
        let (left_rows, right_rows) = profile.join_rows(j).ok_or_else(|| {
            DslError::Invalid(format!("join '{}' references an unknown source", j.name))
        })?;
        let threshold = j.threshold.unwrap_or(config.broadcast_row_threshold);
        joins.push(JoinAdvice {
            name: j.name.clone(),
            left: j.left.clone(),
            right: j.right.clone(),
            left_rows,
            right_rows,
            threshold,
            plan: plan_join(left_rows, right_rows, threshold),
        });
    }

    let quality = profile
        .quality
        .map(|q| QualityAssessment::assess(q, profile.weights.as_ref(), &config.quality))
        .transpose()?;

    let violations = profile
        .profiles
        .iter()
        .filter_map(|(name, p)| {
            let v = p.violations(&config.quality);
            (!v.is_empty()).then(|| (name.clone(), v))
        })
        .collect();

    let freshness = profile
        .hours_since_update
        .map(|h| check_freshness(h, config.quality.freshness_hours));

    let mut engine_properties = cluster.engine_properties();
    engine_properties.extend(profile.tuning.engine_properties());

    let report = AdviceReport {
        data_date: profile.data_date.clone(),
        volume,
        cluster,
        cluster_spec,
        joins,
        quality,
        violations,
        freshness,
        tuning: profile.tuning.clone(),
        engine_properties,
    };
    info!(
        sources = sources.len(),
        joins = report.joins.len(),
        findings = report.has_findings(),
        "advice report ready"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::yaml::parse_run_profile;
    use crate::join::JoinSide;

    const PROFILE: &str = r#"
data_date: "2024-01-15"
sources:
  - { name: customer_data, size_mb: 125.5, rows: 500 }
  - { name: transaction_data, size_mb: 900.0, rows: 2000000 }
joins:
  - { name: txn_customer, left: transaction_data, right: customer_data }
  - { name: pinned, left: transaction_data, right: customer_data, threshold: 100 }
quality: { completeness: 99.2, accuracy: 98.8, consistency: 97.9, timeliness: 99.1 }
hours_since_update: 30
profiles:
  customer_data: { total_rows: 500, duplicate_count: 0 }
"#;

    #[test]
    fn report_covers_every_decision() {
        let profile = parse_run_profile(PROFILE).unwrap();
        let report = advise(&profile, &PipelineConfig::default()).unwrap();

        // 1025.5 MB crosses into the medium tier
        assert_eq!(report.cluster.worker_count, 4);
        assert_eq!(report.joins[0].plan, JoinPlan::broadcast(JoinSide::Right));
        assert_eq!(report.joins[1].threshold, 100);
        assert_eq!(report.joins[1].plan, JoinPlan::shuffle());

        let q = report.quality.as_ref().unwrap();
        assert!((q.composite - 98.75).abs() < 1e-9);
        assert!(q.alert.is_none());

        assert!(!report.freshness.unwrap().is_fresh);
        assert_eq!(report.violations["customer_data"].len(), 1);
        assert!(report.has_findings());
        assert_eq!(report.engine_properties["spark.executor.memory"], "8g");
        assert_eq!(report.tuning, JobTuning::default());
    }

    #[test]
    fn cluster_defaults_come_from_config() {
        let profile = parse_run_profile(PROFILE).unwrap();
        let mut cfg = PipelineConfig::default();
        cfg.cluster.runtime_engine = "STANDARD".to_string();
        let report = advise(&profile, &cfg).unwrap();
        assert_eq!(report.cluster_spec.runtime_engine, "STANDARD");
        assert_eq!(report.cluster_spec.spark_version, "11.3.x-scala2.12");
    }

    #[test]
    fn same_inputs_same_fingerprint() {
        let profile = parse_run_profile(PROFILE).unwrap();
        let cfg = PipelineConfig::default();
        let a = advise(&profile, &cfg).unwrap();
        let b = advise(&profile, &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
