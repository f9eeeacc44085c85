//! Typed task callables for the standard pipeline.
//!
//! Each function is a plain decision over the values it is handed. The graph
//! in `pipeline` wraps them into `TaskFn`s that read run parameters and
//! upstream outputs from the `TaskContext`.

use std::collections::BTreeMap;

use pipeplan_advisor::cluster::{plan_cluster, ClusterPlan, ClusterSpec};
use pipeplan_advisor::freshness::{self, Freshness};
use pipeplan_advisor::quality::{QualityAlert, QualityAssessment, QualityScores, QualityStatus, QualityWeights};
use pipeplan_core::prelude::{Environment, PipelineConfig, QualityThresholds, SourceStats, TaskId, VolumeMetrics};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{DagError, Result};

pub const START_EXTRACTION: &str = "start_extraction_tasks";
pub const VALIDATION_FAILURE: &str = "handle_data_validation_failure";

/// Parameters a run is triggered with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    pub data_date: String,
    pub sources: Vec<SourceStats>,
    pub hours_since_update: Option<u64>,
    pub quality: Option<QualityScores>,
    pub weights: Option<QualityWeights>,
}

/// Resolved locations and settings for one data date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub data_date: String,
    pub environment: Environment,
    pub data_sources: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, String>,
    pub quality_thresholds: QualityThresholds,
}

fn check_date(data_date: &str) -> Result<()> {
    let parts: Vec<&str> = data_date.split('-').collect();
    let shaped = parts.len() == 3
        && [4, 2, 2]
            .iter()
            .zip(&parts)
            .all(|(len, p)| p.len() == *len && p.bytes().all(|b| b.is_ascii_digit()));
    if shaped {
        Ok(())
    } else {
        Err(pipeplan_core::error::Error::validation(format!(
            "data date must be YYYY-MM-DD, got {data_date:?}"
        ))
        .into())
    }
}

pub fn initialize(config: &PipelineConfig, data_date: &str) -> Result<RunContext> {
    check_date(data_date)?;
    let ctx = RunContext {
        data_date: data_date.to_string(),
        environment: config.environment,
        data_sources: config.source_paths(data_date),
        outputs: config.output_paths(data_date),
        quality_thresholds: config.quality.clone(),
    };
    info!(data_date, environment = %ctx.environment, "pipeline configuration generated");
    Ok(ctx)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub data_date: String,
    pub sources: Vec<SourceStats>,
    pub total_sources: usize,
    pub valid_sources: usize,
    pub invalid_sources: usize,
    pub warnings: Vec<String>,
}

impl ValidationSummary {
    /// Branch target: extraction when every source is valid.
    pub fn next_task(&self) -> TaskId {
        if self.invalid_sources > 0 {
            TaskId::from(VALIDATION_FAILURE)
        } else {
            TaskId::from(START_EXTRACTION)
        }
    }

    pub fn volume(&self) -> VolumeMetrics {
        VolumeMetrics::from_sources(&self.sources)
    }
}

/// Count valid and invalid sources. Low row counts are warnings only.
pub fn validate_sources(
    data_date: &str,
    sources: &[SourceStats],
    thresholds: &QualityThresholds,
) -> ValidationSummary {
    let invalid_sources = sources.iter().filter(|s| !s.status.is_valid()).count();
    let warnings = sources
        .iter()
        .filter(|s| s.status.is_valid() && s.row_count < thresholds.min_row_count)
        .map(|s| {
            format!(
                "{} has {} rows, below the minimum of {}",
                s.name, s.row_count, thresholds.min_row_count
            )
        })
        .collect::<Vec<_>>();

    let summary = ValidationSummary {
        data_date: data_date.to_string(),
        sources: sources.to_vec(),
        total_sources: sources.len(),
        valid_sources: sources.len() - invalid_sources,
        invalid_sources,
        warnings,
    };
    if invalid_sources > 0 {
        error!(invalid_sources, total = summary.total_sources, "data validation failed");
    } else {
        info!(total = summary.total_sources, warnings = summary.warnings.len(), "data sources validated");
    }
    summary
}

/// Failure path of the validation branch. Always an error naming the counts.
pub fn validation_failure(summary: &ValidationSummary) -> DagError {
    DagError::TaskFailed {
        task: TaskId::from(VALIDATION_FAILURE),
        reason: format!(
            "data validation failed for {}: {} of {} sources invalid",
            summary.data_date, summary.invalid_sources, summary.total_sources
        ),
    }
}

pub fn check_freshness(hours_since_update: u64, config: &PipelineConfig) -> Freshness {
    freshness::check_freshness(hours_since_update, config.quality.freshness_hours)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAdvice {
    pub volume: VolumeMetrics,
    pub plan: ClusterPlan,
    pub spec: ClusterSpec,
}

/// Size the cluster from validated sources. Refuses a failed validation.
pub fn optimize_cluster(summary: &ValidationSummary, config: &PipelineConfig) -> Result<ClusterAdvice> {
    if summary.invalid_sources > 0 {
        return Err(validation_failure(summary));
    }
    let volume = summary.volume();
    let plan = plan_cluster(&volume);
    Ok(ClusterAdvice {
        volume,
        plan,
        spec: plan.to_cluster_spec(&config.cluster),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub data_date: String,
    pub environment: Environment,
    pub assessment: QualityAssessment,
    pub alerts: Vec<QualityAlert>,
}

pub fn quality_report(
    run: &RunContext,
    scores: QualityScores,
    weights: Option<&QualityWeights>,
) -> Result<QualityReport> {
    let assessment = QualityAssessment::assess(scores, weights, &run.quality_thresholds)?;
    let alerts = assessment.alert.iter().cloned().collect();
    info!(score = assessment.composite, status = %assessment.status, "quality report generated");
    Ok(QualityReport {
        data_date: run.data_date.clone(),
        environment: run.environment,
        assessment,
        alerts,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub status: QualityStatus,
    pub color: String,
    pub text: String,
    pub data_date: String,
    pub environment: Environment,
    pub quality_score: f64,
    pub alerts_count: usize,
    pub slack_channel: String,
    pub email_recipients: Vec<String>,
}

pub fn prepare_notification(report: &QualityReport, config: &PipelineConfig) -> Notification {
    let status = report.assessment.status;
    let score = report.assessment.composite;
    if status != QualityStatus::Success {
        warn!(score, %status, "pipeline finished below the quality target");
    }
    Notification {
        status,
        color: status.color().to_string(),
        text: format!(
            "Pipeline {status} for {} ({}): quality score {score:.1}%",
            report.data_date, report.environment
        ),
        data_date: report.data_date.clone(),
        environment: report.environment,
        quality_score: score,
        alerts_count: report.alerts.len(),
        slack_channel: config.notifications.slack_channel.clone(),
        email_recipients: config.notifications.email_recipients.clone(),
    }
}
