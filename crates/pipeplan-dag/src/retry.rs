//! Fixed-count, fixed-delay retry policy attached to each task.
//!
//! Data only. The scheduler reads it; nothing here sleeps or re-invokes.

use std::time::Duration;

use pipeplan_core::config::PipelineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay_secs: 5 * 60,
        }
    }
}

impl RetryPolicy {
    pub const fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            delay_secs: delay.as_secs(),
        }
    }

    pub const fn none() -> Self {
        Self {
            retries: 0,
            delay_secs: 0,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            retries: config.retries,
            delay_secs: config.retry_delay_secs,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// First attempt plus every retry.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before retry number `attempt` (1-based); `None` once the budget is spent.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        (attempt >= 1 && attempt <= self.retries).then(|| self.delay())
    }
}
