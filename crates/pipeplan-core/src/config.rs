//! Pipeline configuration, loaded once at process start and passed by reference.
//!
//! Precedence is defaults, then `PIPEPLAN_*` environment variables, then
//! whatever the binary layer overrides from its own flags.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default row-count threshold below which a join input may be broadcast.
pub const DEFAULT_BROADCAST_ROW_THRESHOLD: u64 = 1_000_000;

/// Names of the raw datasets every run reads.
pub const SOURCE_NAMES: [&str; 3] = ["customer_data", "transaction_data", "product_data"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" => Ok(Environment::Prod),
            other => Err(Error::Config(format!(
                "unknown environment '{other}' (expected dev, staging, or prod)"
            ))),
        }
    }
}

/// Quality gates applied to extracted data and to the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_row_count: u64,
    /// Percent, `[0, 100]`.
    pub max_null_percentage: f64,
    /// Percent, `[0, 100]`.
    pub max_duplicate_percentage: f64,
    pub freshness_hours: u64,
    /// Composite scores below this raise an alert; at or above it the run is a plain success.
    pub alert_score: f64,
    /// Composite scores at or above this (but below `alert_score`) succeed with warnings.
    pub warning_score: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_row_count: 1000,
            max_null_percentage: 5.0,
            max_duplicate_percentage: 1.0,
            freshness_hours: 24,
            alert_score: 95.0,
            warning_score: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub slack_channel: String,
    pub email_recipients: Vec<String>,
    pub pagerduty_service_key: Option<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            slack_channel: "#data-alerts".to_string(),
            email_recipients: vec!["data-team@company.com".to_string()],
            pagerduty_service_key: None,
        }
    }
}

/// Platform settings that do not depend on data volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterDefaults {
    pub runtime_version: String,
    pub runtime_engine: String,
    pub data_security_mode: String,
    pub autotermination_minutes: u32,
    pub enable_elastic_disk: bool,
}

impl Default for ClusterDefaults {
    fn default() -> Self {
        Self {
            runtime_version: "11.3.x-scala2.12".to_string(),
            runtime_engine: "PHOTON".to_string(),
            data_security_mode: "USER_ISOLATION".to_string(),
            autotermination_minutes: 30,
            enable_elastic_disk: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub environment: Environment,

    /// Falls back to `data-lake-<environment>` when unset.
    pub data_lake_bucket: Option<String>,

    pub warehouse_conn_id: String,
    pub spark_conn_id: String,

    pub broadcast_row_threshold: u64,

    /// Fixed retry count applied to every task unless overridden.
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub execution_timeout_secs: u64,

    pub quality: QualityThresholds,
    pub notifications: NotificationSettings,
    pub cluster: ClusterDefaults,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            data_lake_bucket: None,
            warehouse_conn_id: "snowflake_default".to_string(),
            spark_conn_id: "databricks_default".to_string(),
            broadcast_row_threshold: DEFAULT_BROADCAST_ROW_THRESHOLD,
            retries: 2,
            retry_delay_secs: 5 * 60,
            execution_timeout_secs: 2 * 60 * 60,
            quality: QualityThresholds::default(),
            notifications: NotificationSettings::default(),
            cluster: ClusterDefaults::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PIPEPLAN_ENVIRONMENT`: dev, staging, or prod
    /// - `PIPEPLAN_DATA_LAKE_BUCKET`: bucket holding raw and processed data
    /// - `PIPEPLAN_WAREHOUSE_CONN_ID` / `PIPEPLAN_SPARK_CONN_ID`: connection ids
    /// - `PIPEPLAN_BROADCAST_ROW_THRESHOLD`: join broadcast threshold (rows)
    /// - `PIPEPLAN_RETRIES` / `PIPEPLAN_RETRY_DELAY_SECS`: default task retry policy
    /// - `PIPEPLAN_MIN_ROW_COUNT` / `PIPEPLAN_FRESHNESS_HOURS`: quality gates
    /// - `PIPEPLAN_SLACK_CHANNEL` / `PIPEPLAN_EMAIL_RECIPIENTS` / `PIPEPLAN_PAGERDUTY_KEY`
    /// - `PIPEPLAN_RUNTIME_VERSION` / `PIPEPLAN_AUTOTERMINATION_MINUTES`: cluster defaults
    ///
    /// Unparsable values are a configuration error rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] but reads from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(s) = lookup("PIPEPLAN_ENVIRONMENT") {
            cfg.environment = s.parse()?;
        }
        if let Some(s) = lookup("PIPEPLAN_DATA_LAKE_BUCKET") {
            cfg.data_lake_bucket = Some(s);
        }
        if let Some(s) = lookup("PIPEPLAN_WAREHOUSE_CONN_ID") {
            cfg.warehouse_conn_id = s;
        }
        if let Some(s) = lookup("PIPEPLAN_SPARK_CONN_ID") {
            cfg.spark_conn_id = s;
        }
        if let Some(s) = lookup("PIPEPLAN_BROADCAST_ROW_THRESHOLD") {
            cfg.broadcast_row_threshold = parse_var("PIPEPLAN_BROADCAST_ROW_THRESHOLD", &s)?;
        }
        if let Some(s) = lookup("PIPEPLAN_RETRIES") {
            cfg.retries = parse_var("PIPEPLAN_RETRIES", &s)?;
        }
        if let Some(s) = lookup("PIPEPLAN_RETRY_DELAY_SECS") {
            cfg.retry_delay_secs = parse_var("PIPEPLAN_RETRY_DELAY_SECS", &s)?;
        }
        if let Some(s) = lookup("PIPEPLAN_MIN_ROW_COUNT") {
            cfg.quality.min_row_count = parse_var("PIPEPLAN_MIN_ROW_COUNT", &s)?;
        }
        if let Some(s) = lookup("PIPEPLAN_FRESHNESS_HOURS") {
            cfg.quality.freshness_hours = parse_var("PIPEPLAN_FRESHNESS_HOURS", &s)?;
        }
        if let Some(s) = lookup("PIPEPLAN_SLACK_CHANNEL") {
            cfg.notifications.slack_channel = s;
        }
        if let Some(s) = lookup("PIPEPLAN_EMAIL_RECIPIENTS") {
            cfg.notifications.email_recipients = split_list(&s);
        }
        if let Some(s) = lookup("PIPEPLAN_PAGERDUTY_KEY") {
            cfg.notifications.pagerduty_service_key = Some(s);
        }
        if let Some(s) = lookup("PIPEPLAN_RUNTIME_VERSION") {
            cfg.cluster.runtime_version = s;
        }
        if let Some(s) = lookup("PIPEPLAN_AUTOTERMINATION_MINUTES") {
            cfg.cluster.autotermination_minutes = parse_var("PIPEPLAN_AUTOTERMINATION_MINUTES", &s)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        for (name, v) in [
            ("max_null_percentage", q.max_null_percentage),
            ("max_duplicate_percentage", q.max_duplicate_percentage),
            ("alert_score", q.alert_score),
            ("warning_score", q.warning_score),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return Err(Error::Config(format!("{name} must be within [0, 100], got {v}")));
            }
        }
        if q.warning_score > q.alert_score {
            return Err(Error::Config(format!(
                "warning_score ({}) must not exceed alert_score ({})",
                q.warning_score, q.alert_score
            )));
        }
        if self.execution_timeout_secs == 0 {
            return Err(Error::Config("execution_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn data_lake_bucket(&self) -> String {
        self.data_lake_bucket
            .clone()
            .unwrap_or_else(|| format!("data-lake-{}", self.environment))
    }

    /// Raw input location per source for one data date.
    pub fn source_paths(&self, data_date: &str) -> BTreeMap<String, String> {
        let bucket = self.data_lake_bucket();
        SOURCE_NAMES
            .iter()
            .map(|name| {
                let dir = name.trim_end_matches("_data");
                let plural = format!("{dir}s");
                (
                    (*name).to_string(),
                    format!("s3://{bucket}/raw/{plural}/{data_date}/"),
                )
            })
            .collect()
    }

    /// Output locations for one data date.
    pub fn output_paths(&self, data_date: &str) -> BTreeMap<String, String> {
        let bucket = self.data_lake_bucket();
        let mut out = BTreeMap::new();
        out.insert(
            "processed_data".to_string(),
            format!("s3://{bucket}/processed/{data_date}/"),
        );
        out.insert(
            "analytics_tables".to_string(),
            format!("{}_analytics", self.environment),
        );
        out.insert(
            "ml_features".to_string(),
            format!("s3://{bucket}/ml-features/{data_date}/"),
        );
        out
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}")))
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.broadcast_row_threshold, 1_000_000);
        assert_eq!(cfg.retries, 2);
        assert_eq!(cfg.data_lake_bucket(), "data-lake-dev");
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = PipelineConfig::from_lookup(lookup(&[
            ("PIPEPLAN_ENVIRONMENT", "prod"),
            ("PIPEPLAN_BROADCAST_ROW_THRESHOLD", "250000"),
            ("PIPEPLAN_EMAIL_RECIPIENTS", "a@x.io, ,b@x.io"),
        ]))
        .unwrap();
        assert_eq!(cfg.environment, Environment::Prod);
        assert_eq!(cfg.broadcast_row_threshold, 250_000);
        assert_eq!(cfg.notifications.email_recipients, vec!["a@x.io", "b@x.io"]);
        assert_eq!(cfg.data_lake_bucket(), "data-lake-prod");
    }

    #[test]
    fn cluster_defaults_from_env() {
        let cfg = PipelineConfig::from_lookup(lookup(&[
            ("PIPEPLAN_RUNTIME_VERSION", "13.3.x-scala2.12"),
            ("PIPEPLAN_AUTOTERMINATION_MINUTES", "90"),
        ]))
        .unwrap();
        assert_eq!(cfg.cluster.runtime_version, "13.3.x-scala2.12");
        assert_eq!(cfg.cluster.autotermination_minutes, 90);
        assert_eq!(cfg.cluster.runtime_engine, "PHOTON");
    }

    #[test]
    fn bad_env_values_are_errors() {
        let err = PipelineConfig::from_lookup(lookup(&[("PIPEPLAN_RETRIES", "-1")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("PIPEPLAN_RETRIES"));

        let err =
            PipelineConfig::from_lookup(lookup(&[("PIPEPLAN_ENVIRONMENT", "qa")])).unwrap_err();
        assert!(err.to_string().contains("qa"));
    }

    #[test]
    fn inverted_score_thresholds_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.quality.warning_score = 97.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn source_paths_follow_bucket_layout() {
        let cfg = PipelineConfig {
            data_lake_bucket: Some("lake".into()),
            ..Default::default()
        };
        let paths = cfg.source_paths("2024-01-15");
        assert_eq!(paths["customer_data"], "s3://lake/raw/customers/2024-01-15/");
        assert_eq!(paths["transaction_data"], "s3://lake/raw/transactions/2024-01-15/");
        assert_eq!(paths["product_data"], "s3://lake/raw/products/2024-01-15/");
        assert_eq!(cfg.output_paths("2024-01-15")["analytics_tables"], "dev_analytics");
    }
}
