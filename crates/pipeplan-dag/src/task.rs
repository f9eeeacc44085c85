//! Task nodes: identity, scheduling policy, and the callable they wrap.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pipeplan_core::config::PipelineConfig;
use pipeplan_core::id::{GroupId, TaskId};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DagError, Result};
use crate::retry::RetryPolicy;
use crate::trigger::TriggerRule;

/// What a callable hands back to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TaskOutput {
    /// Structured value consumed by downstream tasks.
    Value(serde_json::Value),
    /// Id of the downstream task to follow; siblings are skipped.
    Branch(TaskId),
    Empty,
}

impl TaskOutput {
    pub fn value<T: Serialize>(v: &T) -> Result<Self> {
        Ok(TaskOutput::Value(serde_json::to_value(v)?))
    }
}

static NO_PARAMS: serde_json::Value = serde_json::Value::Null;

/// Everything a callable may read. Upstream values are passed in explicitly.
pub struct TaskContext<'a> {
    pub config: &'a PipelineConfig,
    /// Per-run parameters supplied by whoever triggers the run.
    pub params: &'a serde_json::Value,
    pub upstream: &'a BTreeMap<TaskId, TaskOutput>,
}

impl<'a> TaskContext<'a> {
    pub fn new(config: &'a PipelineConfig, upstream: &'a BTreeMap<TaskId, TaskOutput>) -> Self {
        Self {
            config,
            params: &NO_PARAMS,
            upstream,
        }
    }

    pub fn with_params(mut self, params: &'a serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.params.clone())?)
    }

    /// Value produced by upstream task `id`.
    pub fn input(&self, id: &str) -> Result<&serde_json::Value> {
        match self.upstream.get(&TaskId::from(id)) {
            Some(TaskOutput::Value(v)) => Ok(v),
            _ => Err(DagError::MissingInput(TaskId::from(id))),
        }
    }

    pub fn input_as<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        Ok(serde_json::from_value(self.input(id)?.clone())?)
    }
}

pub type TaskFn = Arc<dyn Fn(&TaskContext<'_>) -> Result<TaskOutput> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    Callable,
    /// Callable whose output picks the next task.
    Branch,
    /// No-op join/fan-out point.
    Marker,
    /// Work performed by a platform operator (extract, warehouse load, ...).
    External { operator: String },
}

#[derive(Clone, Serialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub group: Option<GroupId>,
    #[serde(flatten)]
    pub kind: TaskKind,
    pub retry: RetryPolicy,
    pub trigger: TriggerRule,
    pub timeout_secs: Option<u64>,
    #[serde(skip)]
    pub callable: Option<TaskFn>,
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("kind", &self.kind)
            .field("retry", &self.retry)
            .field("trigger", &self.trigger)
            .field("timeout_secs", &self.timeout_secs)
            .field("callable", &self.callable.is_some())
            .finish()
    }
}

impl TaskNode {
    fn with_kind(id: impl Into<TaskId>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            group: None,
            kind,
            retry: RetryPolicy::default(),
            trigger: TriggerRule::default(),
            timeout_secs: None,
            callable: None,
        }
    }

    pub fn callable<F>(id: impl Into<TaskId>, f: F) -> Self
    where
        F: Fn(&TaskContext<'_>) -> Result<TaskOutput> + Send + Sync + 'static,
    {
        let mut node = Self::with_kind(id, TaskKind::Callable);
        node.callable = Some(Arc::new(f));
        node
    }

    pub fn branch<F>(id: impl Into<TaskId>, f: F) -> Self
    where
        F: Fn(&TaskContext<'_>) -> Result<TaskOutput> + Send + Sync + 'static,
    {
        let mut node = Self::with_kind(id, TaskKind::Branch);
        node.callable = Some(Arc::new(f));
        node
    }

    pub fn marker(id: impl Into<TaskId>) -> Self {
        Self::with_kind(id, TaskKind::Marker)
    }

    pub fn external(id: impl Into<TaskId>, operator: impl Into<String>) -> Self {
        Self::with_kind(
            id,
            TaskKind::External {
                operator: operator.into(),
            },
        )
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerRule) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn in_group(mut self, group: impl Into<GroupId>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Run the wrapped callable once. Tasks without one produce `Empty`.
    ///
    /// Failures come back as `TaskFailed` naming this task; a branch task that
    /// does not return a `Branch` output is also a failure.
    pub fn invoke(&self, ctx: &TaskContext<'_>) -> Result<TaskOutput> {
        let Some(f) = &self.callable else {
            return Ok(TaskOutput::Empty);
        };
        let out = f(ctx).map_err(|e| match e {
            DagError::TaskFailed { .. } => e,
            other => DagError::TaskFailed {
                task: self.id.clone(),
                reason: other.to_string(),
            },
        })?;
        if self.kind == TaskKind::Branch && !matches!(out, TaskOutput::Branch(_)) {
            return Err(DagError::TaskFailed {
                task: self.id.clone(),
                reason: "branch task returned no branch target".to_string(),
            });
        }
        Ok(out)
    }
}
