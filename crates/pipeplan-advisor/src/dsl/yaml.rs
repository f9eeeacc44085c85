//! YAML → `RunProfile` parser.
//!
//! Example:
//! ```yaml
//! data_date: "2024-01-15"
//! sources:
//!   - { name: customer_data,    size_mb: 125.5, rows: 50000 }
//!   - { name: transaction_data, size_mb: 980.0, rows: 2000000 }
//! joins:
//!   - { name: txn_customer, left: transaction_data, right: customer_data }
//! quality: { completeness: 99.2, accuracy: 98.8, consistency: 97.9, timeliness: 99.1 }
//! hours_since_update: 2
//! tuning: { partition_columns: [processing_date], cache_level: MEMORY_AND_DISK }
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pipeplan_core::config::PipelineConfig;
use pipeplan_core::source::{SourceStats, SourceStatus};
use pipeplan_core::volume::megabytes_to_bytes;

use crate::quality::{DatasetProfile, QualityScores, QualityWeights};
use crate::session::JobTuning;

#[derive(Debug, Error)]
pub enum DslError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid run profile: {0}")]
    Invalid(String),
    #[error(transparent)]
    Core(#[from] pipeplan_core::error::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDef {
    pub name: String,
    /// Falls back to the configured data-lake layout when omitted.
    #[serde(default)]
    pub path: Option<String>,
    pub size_mb: f64,
    pub rows: u64,
    #[serde(default)]
    pub status: SourceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinDef {
    pub name: String,
    pub left: String,
    pub right: String,
    /// Overrides the configured broadcast threshold for this join only.
    #[serde(default)]
    pub threshold: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunProfile {
    #[serde(default)]
    pub data_date: Option<String>,
    pub sources: Vec<SourceDef>,
    #[serde(default)]
    pub joins: Vec<JoinDef>,
    #[serde(default)]
    pub quality: Option<QualityScores>,
    #[serde(default)]
    pub weights: Option<QualityWeights>,
    #[serde(default)]
    pub hours_since_update: Option<u64>,
    #[serde(default)]
    pub tuning: JobTuning,
    /// Per-source null/duplicate counts, keyed by source name.
    #[serde(default)]
    pub profiles: BTreeMap<String, DatasetProfile>,
}

impl RunProfile {
    /// Resolve sources into typed stats, filling paths from `config` when absent.
    pub fn source_stats(&self, config: &PipelineConfig) -> Result<Vec<SourceStats>, DslError> {
        let date = self.data_date.as_deref().unwrap_or("latest");
        let layout = config.source_paths(date);
        self.sources
            .iter()
            .map(|s| {
                let path = s
                    .path
                    .clone()
                    .or_else(|| layout.get(&s.name).cloned())
                    .unwrap_or_default();
                Ok(SourceStats {
                    name: s.name.clone(),
                    path,
                    size_bytes: megabytes_to_bytes(s.size_mb)?,
                    row_count: s.rows,
                    status: s.status,
                })
            })
            .collect()
    }

    fn source(&self, name: &str) -> Option<&SourceDef> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Row counts of a join's two inputs.
    pub fn join_rows(&self, join: &JoinDef) -> Option<(u64, u64)> {
        Some((self.source(&join.left)?.rows, self.source(&join.right)?.rows))
    }

    pub fn validate(&self) -> Result<(), DslError> {
        if self.sources.is_empty() {
            return Err(DslError::Invalid("at least one source is required".into()));
        }

        let mut seen = HashSet::new();
        for s in &self.sources {
            if s.name.trim().is_empty() {
                return Err(DslError::Invalid("source name must not be empty".into()));
            }
            if !seen.insert(s.name.as_str()) {
                return Err(DslError::Invalid(format!("duplicate source '{}'", s.name)));
            }
            megabytes_to_bytes(s.size_mb).map_err(|e| {
                DslError::Invalid(format!("source '{}': {}", s.name, e))
            })?;
        }

        let mut join_names = HashSet::new();
        for j in &self.joins {
            if !join_names.insert(j.name.as_str()) {
                return Err(DslError::Invalid(format!("duplicate join '{}'", j.name)));
            }
            for side in [&j.left, &j.right] {
                if !seen.contains(side.as_str()) {
                    return Err(DslError::Invalid(format!(
                        "join '{}' references unknown source '{}'",
                        j.name, side
                    )));
                }
            }
        }

        for (name, profile) in &self.profiles {
            if !seen.contains(name.as_str()) {
                return Err(DslError::Invalid(format!(
                    "profile given for unknown source '{name}'"
                )));
            }
            profile
                .validate()
                .map_err(|e| DslError::Invalid(format!("profile '{name}': {e}")))?;
        }

        if let Some(q) = &self.quality {
            q.validate()?;
        }
        if let Some(w) = &self.weights {
            w.validate()
                .map_err(|e| DslError::Invalid(format!("weights: {e}")))?;
        }
        self.tuning.validate()?;
        Ok(())
    }
}

/// Parse and validate a YAML run profile.
pub fn parse_run_profile(yaml_src: &str) -> Result<RunProfile, DslError> {
    let profile: RunProfile = serde_yaml::from_str(yaml_src)?;
    profile.validate()?;
    Ok(profile)
}
