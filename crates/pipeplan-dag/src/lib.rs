#![forbid(unsafe_code)]
//! pipeplan-dag: the pipeline's task graph as an explicit value.
//!
//! Nodes carry a callable, a retry policy, and a trigger rule. This crate
//! builds and validates the graph and provides the decision callables; running
//! it (ordering attempts, sleeping between retries, tracking task state) is
//! the external scheduler's job.

pub mod error;
pub mod graph;
pub mod pipeline;
pub mod retry;
pub mod task;
pub mod tasks;
pub mod trigger;

pub use error::DagError;
pub use graph::TaskGraph;
pub use pipeline::standard_pipeline;
pub use retry::RetryPolicy;
pub use task::{TaskContext, TaskFn, TaskKind, TaskNode, TaskOutput};
pub use trigger::{TaskState, TriggerRule};
