//! Cluster-shape selection.
//!
//! Inputs:
//! - `VolumeMetrics` (total bytes across the run's sources).
//!
//! Output:
//! - A `ClusterPlan` picked from three fixed tiers, and optionally the full
//!   `ClusterSpec` request the compute platform expects.
//!
//! Tiers are left-closed, right-open in MB; the top tier is unbounded.

use std::collections::BTreeMap;
use std::fmt;

pub use pipeplan_core::config::ClusterDefaults;
use pipeplan_core::volume::{VolumeMetrics, BYTES_PER_MB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerClass {
    Small,
    Medium,
    Large,
}

impl WorkerClass {
    /// Machine type the platform provisions for this class.
    pub fn instance_type(self) -> &'static str {
        match self {
            WorkerClass::Small => "i3.large",
            WorkerClass::Medium => "i3.xlarge",
            WorkerClass::Large => "i3.2xlarge",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerClass::Small => "small",
            WorkerClass::Medium => "medium",
            WorkerClass::Large => "large",
        }
    }
}

impl fmt::Display for WorkerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memory quantity in GiB, rendered the way engine properties expect (`"8g"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemorySize {
    gib: u32,
}

impl MemorySize {
    pub const fn gib(gib: u32) -> Self {
        Self { gib }
    }

    pub const fn as_gib(self) -> u32 {
        self.gib
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}g", self.gib)
    }
}

impl Serialize for MemorySize {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MemorySize {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        let digits = raw
            .strip_suffix('g')
            .or_else(|| raw.strip_suffix('G'))
            .ok_or_else(|| serde::de::Error::custom(format!("expected '<n>g', got {raw:?}")))?;
        digits
            .parse()
            .map(MemorySize::gib)
            .map_err(serde::de::Error::custom)
    }
}

/// Recommended cluster shape. A value type: two plans are the same plan iff
/// their fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterPlan {
    pub worker_count: u32,
    pub worker_class: WorkerClass,
    pub memory_per_executor: MemorySize,
    pub core_count: u32,
}

struct Tier {
    /// Exclusive upper bound in MB; `None` for the top tier.
    below_mb: Option<u64>,
    plan: ClusterPlan,
}

const TIERS: [Tier; 3] = [
    Tier {
        below_mb: Some(1_000),
        plan: ClusterPlan {
            worker_count: 2,
            worker_class: WorkerClass::Small,
            memory_per_executor: MemorySize::gib(4),
            core_count: 2,
        },
    },
    Tier {
        below_mb: Some(10_000),
        plan: ClusterPlan {
            worker_count: 4,
            worker_class: WorkerClass::Medium,
            memory_per_executor: MemorySize::gib(8),
            core_count: 4,
        },
    },
    Tier {
        below_mb: None,
        plan: ClusterPlan {
            worker_count: 8,
            worker_class: WorkerClass::Large,
            memory_per_executor: MemorySize::gib(16),
            core_count: 8,
        },
    },
];

/// Pick the cluster tier for `metrics`. Total over every input.
pub fn plan_cluster(metrics: &VolumeMetrics) -> ClusterPlan {
    let bytes = metrics.total_size_bytes;
    debug!(total_size_bytes = bytes, "planning cluster");

    let plan = TIERS
        .iter()
        .find(|t| match t.below_mb {
            // Compare in bytes so fractional MB never rounds across a boundary.
            Some(mb) => u128::from(bytes) < u128::from(mb) * u128::from(BYTES_PER_MB),
            None => true,
        })
        .map(|t| t.plan)
        .unwrap_or(TIERS[TIERS.len() - 1].plan);

    info!(
        total_mb = metrics.total_mb(),
        workers = plan.worker_count,
        class = %plan.worker_class,
        "selected cluster tier"
    );
    plan
}

/// Full new-cluster request as the compute platform consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub num_workers: u32,
    pub worker_type_id: String,
    pub driver_type_id: String,
    pub node_type_id: String,
    pub spark_version: String,
    pub runtime_engine: String,
    pub data_security_mode: String,
    pub autotermination_minutes: u32,
    pub enable_elastic_disk: bool,
    pub spark_conf: BTreeMap<String, String>,
}

impl ClusterPlan {
    /// Engine properties implied by this shape. Driver gets the executor's memory.
    pub fn engine_properties(&self) -> BTreeMap<String, String> {
        let mem = self.memory_per_executor.to_string();
        let mut conf = BTreeMap::new();
        conf.insert("spark.executor.memory".to_string(), mem.clone());
        conf.insert("spark.driver.memory".to_string(), mem);
        conf.insert("spark.executor.cores".to_string(), self.core_count.to_string());
        conf
    }

    pub fn to_cluster_spec(&self, defaults: &ClusterDefaults) -> ClusterSpec {
        let instance = self.worker_class.instance_type().to_string();
        ClusterSpec {
            num_workers: self.worker_count,
            worker_type_id: instance.clone(),
            driver_type_id: instance.clone(),
            node_type_id: instance,
            spark_version: defaults.runtime_version.clone(),
            runtime_engine: defaults.runtime_engine.clone(),
            data_security_mode: defaults.data_security_mode.clone(),
            autotermination_minutes: defaults.autotermination_minutes,
            enable_elastic_disk: defaults.enable_elastic_disk,
            spark_conf: self.engine_properties(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_is_small() {
        assert_eq!(plan_cluster(&VolumeMetrics::new(0)).worker_class, WorkerClass::Small);
    }

    #[test]
    fn one_byte_under_boundary_stays_in_lower_tier() {
        let edge = 1_000 * BYTES_PER_MB;
        assert_eq!(
            plan_cluster(&VolumeMetrics::new(edge - 1)).worker_class,
            WorkerClass::Small
        );
        assert_eq!(plan_cluster(&VolumeMetrics::new(edge)).worker_class, WorkerClass::Medium);
    }

    #[test]
    fn max_input_is_large() {
        let plan = plan_cluster(&VolumeMetrics::new(u64::MAX));
        assert_eq!(plan.worker_class, WorkerClass::Large);
        assert_eq!(plan.worker_count, 8);
    }

    #[test]
    fn memory_size_round_trips_as_string() {
        let json = serde_json::to_string(&MemorySize::gib(16)).unwrap();
        assert_eq!(json, "\"16g\"");
        let back: MemorySize = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MemorySize::gib(16));
        assert!(serde_json::from_str::<MemorySize>("\"16mb\"").is_err());
    }

    #[test]
    fn cluster_spec_uses_class_instance_type() {
        let plan = plan_cluster(&VolumeMetrics::from_mb(5_000));
        let spec = plan.to_cluster_spec(&ClusterDefaults::default());
        assert_eq!(spec.num_workers, 4);
        assert_eq!(spec.worker_type_id, "i3.xlarge");
        assert_eq!(spec.driver_type_id, "i3.xlarge");
        assert_eq!(spec.node_type_id, "i3.xlarge");
        assert_eq!(spec.autotermination_minutes, 30);
        assert_eq!(spec.spark_conf["spark.executor.memory"], "8g");
        assert_eq!(spec.spark_conf["spark.driver.memory"], "8g");
        assert_eq!(spec.spark_conf["spark.executor.cores"], "4");
    }
}
