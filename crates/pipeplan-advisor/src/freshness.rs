//! Staleness check against the configured freshness window.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freshness {
    pub hours_since_update: u64,
    pub threshold_hours: u64,
    pub is_fresh: bool,
}

/// Data is fresh while `hours_since_update <= threshold_hours`.
///
/// Stale data is reported, not rejected; the caller decides whether to proceed.
pub fn check_freshness(hours_since_update: u64, threshold_hours: u64) -> Freshness {
    let is_fresh = hours_since_update <= threshold_hours;
    if !is_fresh {
        warn!(hours_since_update, threshold_hours, "data is older than the freshness window");
    }
    Freshness {
        hours_since_update,
        threshold_hours,
        is_fresh,
    }
}
