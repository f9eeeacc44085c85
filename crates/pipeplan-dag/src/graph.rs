//! Directed task graph with validation and deterministic ordering.
//!
//! Edges point upstream → downstream. Ordering is Kahn's algorithm with ties
//! broken by task id so the same graph always yields the same order.

use std::collections::{BTreeMap, BTreeSet};

use pipeplan_core::hash::{hash_serde, Hash256};
use pipeplan_core::id::TaskId;
use serde::Serialize;

use crate::error::{DagError, Result};
use crate::task::{TaskNode, TaskOutput};

#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskId, TaskNode>,
    downstream: BTreeMap<TaskId, BTreeSet<TaskId>>,
    upstream: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

/// Serializable view of the graph used for hashing and display.
#[derive(Serialize)]
struct GraphShape<'a> {
    tasks: Vec<&'a TaskNode>,
    edges: Vec<(&'a TaskId, &'a TaskId)>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, node: TaskNode) -> Result<&mut Self> {
        if self.tasks.contains_key(&node.id) {
            return Err(DagError::DuplicateTask(node.id));
        }
        self.downstream.entry(node.id.clone()).or_default();
        self.upstream.entry(node.id.clone()).or_default();
        self.tasks.insert(node.id.clone(), node);
        Ok(self)
    }

    fn require(&self, id: &TaskId) -> Result<()> {
        if self.tasks.contains_key(id) {
            Ok(())
        } else {
            Err(DagError::UnknownTask(id.clone()))
        }
    }

    /// `downstream` runs after `upstream`. Re-adding an edge is a no-op.
    pub fn add_edge(&mut self, upstream: &str, downstream: &str) -> Result<&mut Self> {
        let (u, d) = (TaskId::from(upstream), TaskId::from(downstream));
        self.require(&u)?;
        self.require(&d)?;
        if u == d {
            return Err(DagError::SelfEdge(u));
        }
        self.downstream.entry(u.clone()).or_default().insert(d.clone());
        self.upstream.entry(d).or_default().insert(u);
        Ok(self)
    }

    /// `a → b → c → ...`
    pub fn chain(&mut self, ids: &[&str]) -> Result<&mut Self> {
        for pair in ids.windows(2) {
            self.add_edge(pair[0], pair[1])?;
        }
        Ok(self)
    }

    /// `from → each of targets`
    pub fn fan_out(&mut self, from: &str, targets: &[&str]) -> Result<&mut Self> {
        for t in targets {
            self.add_edge(from, t)?;
        }
        Ok(self)
    }

    /// `each of sources → to`
    pub fn fan_in(&mut self, sources: &[&str], to: &str) -> Result<&mut Self> {
        for s in sources {
            self.add_edge(s, to)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&TaskNode> {
        self.tasks.get(&TaskId::from(id))
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.tasks.values()
    }

    pub fn upstream_of(&self, id: &str) -> Result<Vec<&TaskId>> {
        let id = TaskId::from(id);
        self.require(&id)?;
        Ok(self.upstream[&id].iter().collect())
    }

    pub fn downstream_of(&self, id: &str) -> Result<Vec<&TaskId>> {
        let id = TaskId::from(id);
        self.require(&id)?;
        Ok(self.downstream[&id].iter().collect())
    }

    pub fn edge_count(&self) -> usize {
        self.downstream.values().map(BTreeSet::len).sum()
    }

    /// Tasks in dependency order. Fails with `Cycle` naming a task on a cycle.
    pub fn topological_order(&self) -> Result<Vec<&TaskNode>> {
        let mut in_degree: BTreeMap<&TaskId, usize> = self
            .upstream
            .iter()
            .map(|(id, ups)| (id, ups.len()))
            .collect();
        let mut ready: BTreeSet<&TaskId> = in_degree
            .iter()
            .filter_map(|(id, &deg)| (deg == 0).then_some(*id))
            .collect();

        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(id) = ready.pop_first() {
            order.push(&self.tasks[id]);
            for next in &self.downstream[id] {
                if let Some(deg) = in_degree.get_mut(next) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        if order.len() != self.tasks.len() {
            let stuck = in_degree
                .into_iter()
                .find(|(_, deg)| *deg > 0)
                .map(|(id, _)| id.clone())
                .ok_or_else(|| {
                    DagError::Core(pipeplan_core::error::Error::Invariant(
                        "ordering stalled without a remaining task".into(),
                    ))
                })?;
            return Err(DagError::Cycle(stuck));
        }
        Ok(order)
    }

    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Check a branch task's output names one of its direct downstream tasks.
    pub fn resolve_branch<'a>(&self, from: &str, output: &'a TaskOutput) -> Result<&'a TaskId> {
        let from_id = TaskId::from(from);
        self.require(&from_id)?;
        match output {
            TaskOutput::Branch(target) if self.downstream[&from_id].contains(target) => Ok(target),
            TaskOutput::Branch(target) => Err(DagError::InvalidBranch {
                from: from_id,
                target: target.clone(),
            }),
            _ => Err(DagError::TaskFailed {
                task: from_id,
                reason: "expected a branch output".to_string(),
            }),
        }
    }

    /// Stable hash of the graph's shape (tasks, policies, edges). Callables are excluded.
    pub fn shape_hash(&self) -> Result<Hash256> {
        let shape = GraphShape {
            tasks: self.tasks.values().collect(),
            edges: self
                .downstream
                .iter()
                .flat_map(|(u, ds)| ds.iter().map(move |d| (u, d)))
                .collect(),
        };
        Ok(hash_serde(&shape)?)
    }
}
