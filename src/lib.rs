//! pipeplan: resource sizing, join strategy, and data quality decisions for
//! a batch ETL pipeline, plus the pipeline's task graph.
//!
//! This crate re-exports the workspace libraries so integration tests and
//! benches can reach everything through one dependency.

pub use pipeplan_advisor as advisor;
pub use pipeplan_core as core;
pub use pipeplan_dag as dag;
