//! Audit record emitted alongside an advice report.
//!
//! Ties a report fingerprint to the task graph it was produced for, so the
//! scheduler-side run can be matched back to the exact decisions it used.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceManifest {
    pub id: ManifestId,

    /// Stable hash of the advice report.
    pub advice_hash: Hash256,

    /// Stable hash of the task graph shape, if one was attached.
    pub graph_hash: Option<Hash256>,

    /// Crate version string for provenance.
    pub version: String,

    /// Milliseconds since Unix epoch (UTC).
    pub created_ms: u64,
}

impl AdviceManifest {
    pub fn new(advice_hash: Hash256, created_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            advice_hash,
            graph_hash: None,
            version: crate::VERSION.to_string(),
            created_ms,
        }
    }

    pub fn with_graph(mut self, graph_hash: Hash256) -> Self {
        self.graph_hash = Some(graph_hash);
        self
    }
}
