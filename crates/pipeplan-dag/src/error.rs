use pipeplan_core::id::TaskId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DagError>;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),
    #[error("unknown task id: {0}")]
    UnknownTask(TaskId),
    #[error("task {0} cannot depend on itself")]
    SelfEdge(TaskId),
    #[error("cycle detected through task {0}")]
    Cycle(TaskId),
    #[error("branch from {from} selected {target}, which is not a direct downstream task")]
    InvalidBranch { from: TaskId, target: TaskId },
    #[error("task {task} failed: {reason}")]
    TaskFailed { task: TaskId, reason: String },
    #[error("missing upstream output from {0}")]
    MissingInput(TaskId),
    #[error(transparent)]
    Core(#[from] pipeplan_core::error::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}
