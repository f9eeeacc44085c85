//! Data quality scoring.
//!
//! The composite score is the plain mean of four sub-scores. A weighted mean
//! is only used when the caller supplies explicit per-dimension weights.

use std::collections::BTreeMap;
use std::fmt;

use pipeplan_core::config::QualityThresholds;
use pipeplan_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Sub-scores, each a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityScores {
    pub completeness: f64,
    pub accuracy: f64,
    pub consistency: f64,
    pub timeliness: f64,
}

/// Non-negative weights per dimension; at least one must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityWeights {
    pub completeness: f64,
    pub accuracy: f64,
    pub consistency: f64,
    pub timeliness: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            completeness: 1.0,
            accuracy: 1.0,
            consistency: 1.0,
            timeliness: 1.0,
        }
    }
}

impl QualityWeights {
    fn values(&self) -> [f64; 4] {
        [self.completeness, self.accuracy, self.consistency, self.timeliness]
    }

    /// Weights must be finite and non-negative, and not all zero.
    pub fn validate(&self) -> Result<()> {
        if let Some(w) = self.values().into_iter().find(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::validation(format!(
                "quality weights must be finite and non-negative, got {w}"
            )));
        }
        if self.values().iter().sum::<f64>() == 0.0 {
            return Err(Error::validation("quality weights must not all be zero"));
        }
        Ok(())
    }
}

impl QualityScores {
    pub fn new(completeness: f64, accuracy: f64, consistency: f64, timeliness: f64) -> Result<Self> {
        let scores = Self {
            completeness,
            accuracy,
            consistency,
            timeliness,
        };
        scores.validate()?;
        Ok(scores)
    }

    /// Check every sub-score is finite and within `[0, 100]`.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in self.dimensions() {
            if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                return Err(Error::validation(format!(
                    "{name} score must be a percentage in [0, 100], got {v}"
                )));
            }
        }
        Ok(())
    }

    fn dimensions(&self) -> [(&'static str, f64); 4] {
        [
            ("completeness", self.completeness),
            ("accuracy", self.accuracy),
            ("consistency", self.consistency),
            ("timeliness", self.timeliness),
        ]
    }

    /// Unweighted mean of the four sub-scores.
    pub fn composite(&self) -> f64 {
        (self.completeness + self.accuracy + self.consistency + self.timeliness) / 4.0
    }

    /// Weighted mean. Fails on negative/non-finite weights or an all-zero set.
    pub fn weighted(&self, weights: &QualityWeights) -> Result<f64> {
        weights.validate()?;
        let (acc, total) = self
            .dimensions()
            .iter()
            .zip(weights.values())
            .fold((0.0, 0.0), |(acc, total), ((_, score), w)| (acc + score * w, total + w));
        Ok(acc / total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityStatus {
    Success,
    SuccessWithWarnings,
    CompletedWithIssues,
}

impl QualityStatus {
    pub fn classify(score: f64, thresholds: &QualityThresholds) -> Self {
        if score >= thresholds.alert_score {
            QualityStatus::Success
        } else if score >= thresholds.warning_score {
            QualityStatus::SuccessWithWarnings
        } else {
            QualityStatus::CompletedWithIssues
        }
    }

    /// Attachment colour used by chat notifications.
    pub fn color(self) -> &'static str {
        match self {
            QualityStatus::Success => "good",
            QualityStatus::SuccessWithWarnings => "warning",
            QualityStatus::CompletedWithIssues => "danger",
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QualityStatus::Success => "SUCCESS",
            QualityStatus::SuccessWithWarnings => "SUCCESS WITH WARNINGS",
            QualityStatus::CompletedWithIssues => "COMPLETED WITH ISSUES",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAlert {
    pub level: AlertLevel,
    pub message: String,
    pub threshold: f64,
    pub actual: f64,
}

/// Alert raised when the composite score drops below the alert threshold.
pub fn score_alert(score: f64, thresholds: &QualityThresholds) -> Option<QualityAlert> {
    if score < thresholds.alert_score {
        warn!(score, threshold = thresholds.alert_score, "quality score below threshold");
        Some(QualityAlert {
            level: AlertLevel::Warning,
            message: "Overall data quality score below threshold".to_string(),
            threshold: thresholds.alert_score,
            actual: score,
        })
    } else {
        None
    }
}

/// Composite score plus the status and alert derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub scores: QualityScores,
    pub composite: f64,
    pub weighted: bool,
    pub status: QualityStatus,
    pub alert: Option<QualityAlert>,
}

impl QualityAssessment {
    /// Score with the plain mean, or the weighted mean when `weights` is given.
    pub fn assess(
        scores: QualityScores,
        weights: Option<&QualityWeights>,
        thresholds: &QualityThresholds,
    ) -> Result<Self> {
        scores.validate()?;
        let composite = match weights {
            Some(w) => scores.weighted(w)?,
            None => scores.composite(),
        };
        Ok(Self {
            scores,
            composite,
            weighted: weights.is_some(),
            status: QualityStatus::classify(composite, thresholds),
            alert: score_alert(composite, thresholds),
        })
    }
}

/// Null and duplicate counts observed on one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetProfile {
    pub total_rows: u64,
    #[serde(default)]
    pub null_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub duplicate_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityViolation {
    RowCountBelowMinimum { actual: u64, minimum: u64 },
    NullPercentageExceeded { column: String, percentage: f64, maximum: f64 },
    DuplicatePercentageExceeded { percentage: f64, maximum: f64 },
}

impl fmt::Display for QualityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityViolation::RowCountBelowMinimum { actual, minimum } => {
                write!(f, "{actual} rows, minimum is {minimum}")
            }
            QualityViolation::NullPercentageExceeded {
                column,
                percentage,
                maximum,
            } => write!(f, "{column} is {percentage:.2}% null, maximum is {maximum}%"),
            QualityViolation::DuplicatePercentageExceeded { percentage, maximum } => {
                write!(f, "{percentage:.2}% duplicates, maximum is {maximum}%")
            }
        }
    }
}

impl DatasetProfile {
    pub fn new(total_rows: u64) -> Self {
        Self {
            total_rows,
            ..Default::default()
        }
    }

    pub fn with_nulls(mut self, column: impl Into<String>, nulls: u64) -> Self {
        self.null_counts.insert(column.into(), nulls);
        self
    }

    pub fn with_duplicates(mut self, duplicates: u64) -> Self {
        self.duplicate_count = duplicates;
        self
    }

    /// No count may exceed the row total.
    pub fn validate(&self) -> Result<()> {
        for (column, &nulls) in &self.null_counts {
            if nulls > self.total_rows {
                return Err(Error::validation(format!(
                    "column '{column}' has {nulls} nulls in {} rows",
                    self.total_rows
                )));
            }
        }
        if self.duplicate_count > self.total_rows {
            return Err(Error::validation(format!(
                "{} duplicates in {} rows",
                self.duplicate_count, self.total_rows
            )));
        }
        Ok(())
    }

    fn percentage(&self, count: u64) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total_rows as f64
        }
    }

    /// Percentage of null values in `column`; unknown columns report 0.
    pub fn null_percentage(&self, column: &str) -> f64 {
        self.null_counts
            .get(column)
            .map(|&n| self.percentage(n))
            .unwrap_or(0.0)
    }

    pub fn duplicate_percentage(&self) -> f64 {
        self.percentage(self.duplicate_count)
    }

    /// Every threshold this profile breaks, in column order.
    pub fn violations(&self, thresholds: &QualityThresholds) -> Vec<QualityViolation> {
        let mut out = Vec::new();
        if self.total_rows < thresholds.min_row_count {
            out.push(QualityViolation::RowCountBelowMinimum {
                actual: self.total_rows,
                minimum: thresholds.min_row_count,
            });
        }
        for column in self.null_counts.keys() {
            let pct = self.null_percentage(column);
            if pct > thresholds.max_null_percentage {
                out.push(QualityViolation::NullPercentageExceeded {
                    column: column.clone(),
                    percentage: pct,
                    maximum: thresholds.max_null_percentage,
                });
            }
        }
        let dup = self.duplicate_percentage();
        if dup > thresholds.max_duplicate_percentage {
            out.push(QualityViolation::DuplicatePercentageExceeded {
                percentage: dup,
                maximum: thresholds.max_duplicate_percentage,
            });
        }
        out
    }
}
