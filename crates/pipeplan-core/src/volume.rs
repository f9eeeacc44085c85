//! Observed data-volume metrics, the input to every sizing decision.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::SourceStats;

/// Bytes in one MB as the sizing tiers count them.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Size (and optionally row count) of the data a run will process.
///
/// Immutable once built; construct one per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VolumeMetrics {
    pub total_size_bytes: u64,
    /// Only the join advisor reads this.
    #[serde(default)]
    pub total_rows: Option<u64>,
}

impl VolumeMetrics {
    pub const fn new(total_size_bytes: u64) -> Self {
        Self {
            total_size_bytes,
            total_rows: None,
        }
    }

    pub const fn with_rows(mut self, total_rows: u64) -> Self {
        self.total_rows = Some(total_rows);
        self
    }

    /// Build from whole megabytes. Saturates at `u64::MAX` bytes.
    pub const fn from_mb(mb: u64) -> Self {
        Self::new(mb.saturating_mul(BYTES_PER_MB))
    }

    /// Build from signed counts as they arrive from loosely typed callers.
    /// Negative values are rejected, never clamped.
    pub fn try_from_signed(total_size_bytes: i64, total_rows: Option<i64>) -> Result<Self> {
        let size = u64::try_from(total_size_bytes).map_err(|_| {
            Error::validation(format!(
                "total_size_bytes must be non-negative, got {total_size_bytes}"
            ))
        })?;
        let rows = total_rows
            .map(|r| {
                u64::try_from(r).map_err(|_| {
                    Error::validation(format!("total_rows must be non-negative, got {r}"))
                })
            })
            .transpose()?;
        Ok(Self {
            total_size_bytes: size,
            total_rows: rows,
        })
    }

    /// Build from a fractional MB figure (extraction reports sizes like `125.5`).
    pub fn from_megabytes(mb: f64) -> Result<Self> {
        Ok(Self::new(megabytes_to_bytes(mb)?))
    }

    /// Sum sizes and rows over every source.
    pub fn from_sources(sources: &[SourceStats]) -> Self {
        let mut size = 0u64;
        let mut rows = 0u64;
        for s in sources {
            size = size.saturating_add(s.size_bytes);
            rows = rows.saturating_add(s.row_count);
        }
        Self::new(size).with_rows(rows)
    }

    pub fn total_mb(&self) -> f64 {
        self.total_size_bytes as f64 / BYTES_PER_MB as f64
    }
}

/// Convert a fractional MB figure to bytes, rejecting negative and non-finite input.
pub fn megabytes_to_bytes(mb: f64) -> Result<u64> {
    if !mb.is_finite() {
        return Err(Error::validation(format!("size in MB must be finite, got {mb}")));
    }
    if mb < 0.0 {
        return Err(Error::validation(format!(
            "size in MB must be non-negative, got {mb}"
        )));
    }
    let bytes = mb * BYTES_PER_MB as f64;
    if bytes > u64::MAX as f64 {
        return Err(Error::validation(format!("size of {mb} MB overflows u64 bytes")));
    }
    Ok(bytes.round() as u64)
}
