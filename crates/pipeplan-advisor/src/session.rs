//! Engine tuning values handed to the dataframe engine.
//!
//! Nothing here runs a query. We only render the knobs (partitioning,
//! bucketing, cache level, adaptive execution) as an ordered property map
//! the engine interprets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use pipeplan_core::config::split_list;
use pipeplan_core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Storage level for datasets the job reuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheLevel {
    None,
    MemoryOnly,
    #[default]
    MemoryAndDisk,
    DiskOnly,
}

impl CacheLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheLevel::None => "NONE",
            CacheLevel::MemoryOnly => "MEMORY_ONLY",
            CacheLevel::MemoryAndDisk => "MEMORY_AND_DISK",
            CacheLevel::DiskOnly => "DISK_ONLY",
        }
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, CacheLevel::None)
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(CacheLevel::None),
            "MEMORY_ONLY" => Ok(CacheLevel::MemoryOnly),
            "MEMORY_AND_DISK" => Ok(CacheLevel::MemoryAndDisk),
            "DISK_ONLY" => Ok(CacheLevel::DiskOnly),
            other => Err(Error::Config(format!(
                "unknown cache level '{other}' (expected NONE, MEMORY_ONLY, MEMORY_AND_DISK, DISK_ONLY)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobTuning {
    pub partition_columns: Vec<String>,
    pub bucket_columns: Vec<String>,
    pub num_buckets: u32,
    pub cache_level: CacheLevel,
    pub adaptive_query: bool,
    pub max_records_per_file: Option<u64>,
    /// 0 leaves the output partitioning alone.
    pub coalesce_partitions: u32,
    pub checkpoint_path: Option<String>,
}

impl Default for JobTuning {
    fn default() -> Self {
        Self {
            partition_columns: Vec::new(),
            bucket_columns: Vec::new(),
            num_buckets: 0,
            cache_level: CacheLevel::MemoryAndDisk,
            adaptive_query: false,
            max_records_per_file: None,
            coalesce_partitions: 0,
            checkpoint_path: None,
        }
    }
}

impl JobTuning {
    pub fn with_partition_columns(mut self, raw: &str) -> Self {
        self.partition_columns = split_list(raw);
        self
    }

    pub fn with_buckets(mut self, raw_columns: &str, num_buckets: u32) -> Self {
        self.bucket_columns = split_list(raw_columns);
        self.num_buckets = num_buckets;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match (self.bucket_columns.is_empty(), self.num_buckets) {
            (false, 0) => Err(Error::Config(format!(
                "bucket columns {:?} need a positive bucket count",
                self.bucket_columns
            ))),
            (true, n) if n > 0 => Err(Error::Config(format!(
                "{n} buckets requested without bucket columns"
            ))),
            _ => Ok(()),
        }
    }

    /// Bucketing applies only with both columns and a positive count.
    pub fn bucketing(&self) -> Option<(u32, &[String])> {
        if self.num_buckets > 0 && !self.bucket_columns.is_empty() {
            Some((self.num_buckets, &self.bucket_columns))
        } else {
            None
        }
    }

    /// Engine properties, in key order.
    pub fn engine_properties(&self) -> BTreeMap<String, String> {
        let mut conf = BTreeMap::new();
        let mut set = |k: &str, v: &str| {
            conf.insert(k.to_string(), v.to_string());
        };

        if self.adaptive_query {
            set("spark.sql.adaptive.enabled", "true");
            set("spark.sql.adaptive.coalescePartitions.enabled", "true");
            set("spark.sql.adaptive.skewJoin.enabled", "true");
            set("spark.sql.adaptive.localShuffleReader.enabled", "true");
            set("spark.sql.adaptive.advisoryPartitionSizeInBytes", "128MB");
        }

        set("spark.dynamicAllocation.enabled", "true");
        set("spark.dynamicAllocation.minExecutors", "2");
        set("spark.dynamicAllocation.maxExecutors", "100");
        set("spark.dynamicAllocation.initialExecutors", "10");
        set("spark.serializer", "org.apache.spark.serializer.KryoSerializer");

        if let Some(n) = self.max_records_per_file {
            set("spark.sql.files.maxRecordsPerFile", &n.to_string());
        }
        conf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_level_parses_platform_names() {
        assert_eq!("memory_only".parse::<CacheLevel>().unwrap(), CacheLevel::MemoryOnly);
        assert_eq!("DISK_ONLY".parse::<CacheLevel>().unwrap(), CacheLevel::DiskOnly);
        assert!(!"NONE".parse::<CacheLevel>().unwrap().is_enabled());
        assert!("OFF_HEAP".parse::<CacheLevel>().is_err());
    }

    #[test]
    fn column_lists_drop_empty_entries() {
        let t = JobTuning::default().with_partition_columns("processing_date,,region, ");
        assert_eq!(t.partition_columns, vec!["processing_date", "region"]);
    }

    #[test]
    fn bucket_config_must_be_consistent() {
        assert!(JobTuning::default().with_buckets("customer_id", 0).validate().is_err());
        assert!(JobTuning::default().with_buckets("", 8).validate().is_err());
        let ok = JobTuning::default().with_buckets("customer_id", 8);
        ok.validate().unwrap();
        assert_eq!(ok.bucketing().map(|(n, _)| n), Some(8));
        assert!(JobTuning::default().bucketing().is_none());
    }

    #[test]
    fn misspelled_knob_rejected() {
        let err = serde_yaml::from_str::<JobTuning>("enable_adaptive_query: true").unwrap_err();
        assert!(err.to_string().contains("enable_adaptive_query"));
        let t: JobTuning = serde_yaml::from_str("adaptive_query: true").unwrap();
        assert!(t.adaptive_query);
    }

    #[test]
    fn adaptive_flags_only_when_enabled() {
        let off = JobTuning::default().engine_properties();
        assert!(!off.contains_key("spark.sql.adaptive.enabled"));
        assert_eq!(off["spark.dynamicAllocation.enabled"], "true");
        assert!(!off.contains_key("spark.sql.autoBroadcastJoinThreshold"));

        let on = JobTuning {
            adaptive_query: true,
            max_records_per_file: Some(500_000),
            ..Default::default()
        }
        .engine_properties();
        assert_eq!(on["spark.sql.adaptive.skewJoin.enabled"], "true");
        assert_eq!(on["spark.sql.adaptive.advisoryPartitionSizeInBytes"], "128MB");
        assert_eq!(on["spark.sql.files.maxRecordsPerFile"], "500000");
    }
}
