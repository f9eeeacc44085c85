#![forbid(unsafe_code)]
//! pipeplan-advisor: stateless decisions handed to the compute platform.
//!
//! Design:
//! - `cluster`: data volume → cluster shape (three fixed tiers).
//! - `join`: row counts → broadcast left / broadcast right / shuffle.
//! - `quality`: composite quality score, status levels, dataset profiles.
//! - `freshness`: staleness check against the configured window.
//! - `session`: engine tuning properties (partitioning, caching, AQE).
//! - `dsl`: YAML run profile → typed inputs.
//! - `report`: runs every decision once and bundles the results.
//!
//! Every function here is pure: same inputs, same output, no hidden state.

pub mod cluster;
pub mod dsl;
pub mod freshness;
pub mod join;
pub mod quality;
pub mod report;
pub mod session;

pub use cluster::{plan_cluster, ClusterDefaults, ClusterPlan, ClusterSpec, MemorySize, WorkerClass};
pub use dsl::yaml::{parse_run_profile, DslError, RunProfile};
pub use freshness::{check_freshness, Freshness};
pub use join::{plan_join, JoinPlan, JoinSide, JoinStrategy};
pub use quality::{
    DatasetProfile, QualityAlert, QualityAssessment, QualityScores, QualityStatus, QualityViolation,
    QualityWeights,
};
pub use report::{advise, AdviceReport};
pub use session::{CacheLevel, JobTuning};
