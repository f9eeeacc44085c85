//! Per-source statistics reported by the extraction step.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    Valid,
    Invalid,
    Missing,
}

impl SourceStatus {
    pub fn is_valid(self) -> bool {
        matches!(self, SourceStatus::Valid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub name: String,
    /// Dataset location, e.g. `s3://bucket/raw/customers/2024-01-15/`.
    pub path: String,
    pub size_bytes: u64,
    pub row_count: u64,
    #[serde(default)]
    pub status: SourceStatus,
}

impl SourceStats {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        size_bytes: u64,
        row_count: u64,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size_bytes,
            row_count,
            status: SourceStatus::Valid,
        }
    }

    pub fn with_status(mut self, status: SourceStatus) -> Self {
        self.status = status;
        self
    }
}
