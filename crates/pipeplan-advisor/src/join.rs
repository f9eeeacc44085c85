//! Join-strategy selection: broadcast the strictly smaller side when it is
//! under the row threshold, shuffle otherwise.

use std::fmt;

pub use pipeplan_core::config::DEFAULT_BROADCAST_ROW_THRESHOLD;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinStrategy {
    BroadcastLeft,
    BroadcastRight,
    Shuffle,
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinStrategy::BroadcastLeft => "BROADCAST_LEFT",
            JoinStrategy::BroadcastRight => "BROADCAST_RIGHT",
            JoinStrategy::Shuffle => "SHUFFLE",
        })
    }
}

/// `broadcast_side` is `Some` exactly when `strategy` is a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawJoinPlan")]
pub struct JoinPlan {
    pub strategy: JoinStrategy,
    pub broadcast_side: Option<JoinSide>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJoinPlan {
    strategy: JoinStrategy,
    #[serde(default)]
    broadcast_side: Option<JoinSide>,
}

impl TryFrom<RawJoinPlan> for JoinPlan {
    type Error = String;

    fn try_from(raw: RawJoinPlan) -> Result<Self, Self::Error> {
        let plan = match raw.strategy {
            JoinStrategy::BroadcastLeft => JoinPlan::broadcast(JoinSide::Left),
            JoinStrategy::BroadcastRight => JoinPlan::broadcast(JoinSide::Right),
            JoinStrategy::Shuffle => JoinPlan::shuffle(),
        };
        if plan.broadcast_side == raw.broadcast_side {
            Ok(plan)
        } else {
            Err(format!(
                "{} does not match broadcast side {:?}",
                raw.strategy, raw.broadcast_side
            ))
        }
    }
}

impl JoinPlan {
    pub const fn broadcast(side: JoinSide) -> Self {
        let strategy = match side {
            JoinSide::Left => JoinStrategy::BroadcastLeft,
            JoinSide::Right => JoinStrategy::BroadcastRight,
        };
        Self {
            strategy,
            broadcast_side: Some(side),
        }
    }

    pub const fn shuffle() -> Self {
        Self {
            strategy: JoinStrategy::Shuffle,
            broadcast_side: None,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.broadcast_side.is_some()
    }
}

/// Decide how to join two inputs given their row counts.
///
/// Right is checked first. Comparisons are strict, so equal inputs and inputs
/// sitting exactly on `threshold` always shuffle.
pub fn plan_join(left_rows: u64, right_rows: u64, threshold: u64) -> JoinPlan {
    let plan = if right_rows < threshold && right_rows < left_rows {
        JoinPlan::broadcast(JoinSide::Right)
    } else if left_rows < threshold && left_rows < right_rows {
        JoinPlan::broadcast(JoinSide::Left)
    } else {
        JoinPlan::shuffle()
    };

    info!(left_rows, right_rows, threshold, strategy = %plan.strategy, "selected join strategy");
    plan
}
