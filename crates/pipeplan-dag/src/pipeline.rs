//! The standard daily pipeline as a `TaskGraph`.

use std::time::Duration;

use pipeplan_core::config::PipelineConfig;
use pipeplan_core::error::Error;
use tracing::debug;

use crate::error::Result;
use crate::graph::TaskGraph;
use crate::retry::RetryPolicy;
use crate::task::{TaskContext, TaskNode, TaskOutput};
use crate::tasks::{self, RunContext, RunParams, ValidationSummary, START_EXTRACTION, VALIDATION_FAILURE};
use crate::trigger::TriggerRule;

pub const INITIALIZE: &str = "initialize_pipeline";
pub const VALIDATE_SOURCES: &str = "validate_data_sources";
pub const CHECK_FRESHNESS: &str = "check_data_freshness";
pub const OPTIMIZE_CLUSTER: &str = "optimize_spark_cluster";
pub const QUALITY_REPORT: &str = "generate_quality_report";
pub const SUCCESS_NOTIFICATION: &str = "send_success_notification";
pub const FAILURE_EMAIL: &str = "send_failure_email";
pub const CLEANUP: &str = "cleanup_resources";
pub const PIPELINE_SUCCESS: &str = "pipeline_success";

const EXTRACTION: [&str; 3] = ["extract_customer_data", "extract_transaction_data", "extract_product_data"];
const QUALITY_CHECKS: [&str; 2] = ["validate_customer_data", "validate_transaction_data"];
const PROCESSING: [&str; 2] = ["process_customer_analytics", "process_transaction_analysis"];
const WAREHOUSE: [&str; 3] = ["load_customer_dimensions", "load_transaction_facts", "create_daily_aggregates"];

/// Sensor timeout for raw data to land.
const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(300);

fn run_context(ctx: &TaskContext<'_>) -> Result<RunContext> {
    ctx.input_as(INITIALIZE)
}

fn summary(ctx: &TaskContext<'_>) -> Result<ValidationSummary> {
    let run = run_context(ctx)?;
    let params: RunParams = ctx.params_as()?;
    Ok(tasks::validate_sources(&run.data_date, &params.sources, &run.quality_thresholds))
}

fn missing_param(name: &str) -> Error {
    Error::validation(format!("run parameter '{name}' was not provided"))
}

/// Build the daily pipeline with retries and timeouts taken from `config`.
pub fn standard_pipeline(config: &PipelineConfig) -> Result<TaskGraph> {
    let retry = RetryPolicy::from_config(config);
    let timeout = Duration::from_secs(config.execution_timeout_secs);
    let done_ok = TriggerRule::NoneFailedMinOneSuccess;

    let nodes = vec![
        TaskNode::callable(INITIALIZE, |ctx| {
            let params: RunParams = ctx.params_as()?;
            TaskOutput::value(&tasks::initialize(ctx.config, &params.data_date)?)
        }),
        TaskNode::branch(VALIDATE_SOURCES, |ctx| Ok(TaskOutput::Branch(summary(ctx)?.next_task()))),
        TaskNode::callable(VALIDATION_FAILURE, |ctx| Err(tasks::validation_failure(&summary(ctx)?))),
        TaskNode::marker(START_EXTRACTION),
        TaskNode::callable(CHECK_FRESHNESS, |ctx| {
            let params: RunParams = ctx.params_as()?;
            let hours = params
                .hours_since_update
                .ok_or_else(|| missing_param("hours_since_update"))?;
            TaskOutput::value(&tasks::check_freshness(hours, ctx.config))
        }),
        TaskNode::callable(OPTIMIZE_CLUSTER, |ctx| {
            TaskOutput::value(&tasks::optimize_cluster(&summary(ctx)?, ctx.config)?)
        }),
        TaskNode::external(EXTRACTION[0], "s3_key_sensor").in_group("extraction_tasks"),
        TaskNode::external(EXTRACTION[1], "s3_key_sensor").in_group("extraction_tasks"),
        TaskNode::external(EXTRACTION[2], "s3_key_sensor").in_group("extraction_tasks"),
        TaskNode::external(QUALITY_CHECKS[0], "great_expectations").in_group("quality_checks"),
        TaskNode::external(QUALITY_CHECKS[1], "great_expectations").in_group("quality_checks"),
        TaskNode::external(PROCESSING[0], "databricks_submit_run").in_group("spark_processing"),
        TaskNode::external(PROCESSING[1], "glue_job").in_group("spark_processing"),
        TaskNode::external(WAREHOUSE[0], "snowflake").in_group("warehouse_loading"),
        TaskNode::external(WAREHOUSE[1], "snowflake").in_group("warehouse_loading"),
        TaskNode::external(WAREHOUSE[2], "snowflake").in_group("warehouse_loading"),
        TaskNode::callable(QUALITY_REPORT, |ctx| {
            let run = run_context(ctx)?;
            let params: RunParams = ctx.params_as()?;
            let scores = params.quality.ok_or_else(|| missing_param("quality"))?;
            TaskOutput::value(&tasks::quality_report(&run, scores, params.weights.as_ref())?)
        })
        .with_trigger(done_ok),
        TaskNode::callable(SUCCESS_NOTIFICATION, |ctx| {
            let report: tasks::QualityReport = ctx.input_as(QUALITY_REPORT)?;
            TaskOutput::value(&tasks::prepare_notification(&report, ctx.config))
        })
        .with_trigger(done_ok),
        TaskNode::external(FAILURE_EMAIL, "email").with_trigger(TriggerRule::OneFailed),
        TaskNode::external(CLEANUP, "bash").with_trigger(done_ok),
        TaskNode::marker(PIPELINE_SUCCESS).with_trigger(done_ok),
    ];

    let mut graph = TaskGraph::new();
    for node in nodes {
        let node = if EXTRACTION.contains(&node.id.as_str()) {
            node.with_timeout(EXTRACTION_TIMEOUT)
        } else {
            node.with_timeout(timeout)
        };
        graph.add_task(node.with_retry(retry))?;
    }

    graph
        .chain(&[INITIALIZE, VALIDATE_SOURCES])?
        .fan_out(VALIDATE_SOURCES, &[VALIDATION_FAILURE, START_EXTRACTION])?
        .fan_out(START_EXTRACTION, &[CHECK_FRESHNESS, OPTIMIZE_CLUSTER])?;

    // Group to group: every task of one stage feeds every task of the next.
    let stages: [&[&str]; 6] = [
        &[CHECK_FRESHNESS, OPTIMIZE_CLUSTER],
        &EXTRACTION,
        &QUALITY_CHECKS,
        &PROCESSING,
        &WAREHOUSE,
        &[QUALITY_REPORT],
    ];
    for pair in stages.windows(2) {
        for up in pair[0] {
            graph.fan_out(up, pair[1])?;
        }
    }

    graph
        .fan_out(QUALITY_REPORT, &[SUCCESS_NOTIFICATION, FAILURE_EMAIL])?
        .fan_in(&[SUCCESS_NOTIFICATION, FAILURE_EMAIL], CLEANUP)?
        .chain(&[CLEANUP, PIPELINE_SUCCESS])?;

    graph.validate()?;
    debug!(tasks = graph.len(), edges = graph.edge_count(), "standard pipeline built");
    Ok(graph)
}
