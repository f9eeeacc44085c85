//! Trigger rules: when a task becomes eligible given its upstream outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal state of an upstream task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Success,
    Failed,
    Skipped,
    UpstreamFailed,
}

impl TaskState {
    pub fn is_failure(self) -> bool {
        matches!(self, TaskState::Failed | TaskState::UpstreamFailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRule {
    #[default]
    AllSuccess,
    AllFailed,
    AllDone,
    OneSuccess,
    OneFailed,
    NoneFailed,
    NoneFailedMinOneSuccess,
    Always,
}

impl TriggerRule {
    /// Whether a task with this rule may run once every upstream has settled.
    ///
    /// Tasks without upstreams are always eligible.
    pub fn is_satisfied(self, upstream: &[TaskState]) -> bool {
        if upstream.is_empty() {
            return true;
        }
        let any_success = upstream.iter().any(|s| *s == TaskState::Success);
        let any_failed = upstream.iter().any(|s| s.is_failure());
        match self {
            TriggerRule::AllSuccess => upstream.iter().all(|s| *s == TaskState::Success),
            TriggerRule::AllFailed => upstream.iter().all(|s| s.is_failure()),
            TriggerRule::AllDone | TriggerRule::Always => true,
            TriggerRule::OneSuccess => any_success,
            TriggerRule::OneFailed => any_failed,
            TriggerRule::NoneFailed => !any_failed,
            TriggerRule::NoneFailedMinOneSuccess => !any_failed && any_success,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerRule::AllSuccess => "all_success",
            TriggerRule::AllFailed => "all_failed",
            TriggerRule::AllDone => "all_done",
            TriggerRule::OneSuccess => "one_success",
            TriggerRule::OneFailed => "one_failed",
            TriggerRule::NoneFailed => "none_failed",
            TriggerRule::NoneFailedMinOneSuccess => "none_failed_min_one_success",
            TriggerRule::Always => "always",
        }
    }
}

impl fmt::Display for TriggerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskState::*;

    #[test]
    fn roots_always_eligible() {
        assert!(TriggerRule::OneFailed.is_satisfied(&[]));
        assert!(TriggerRule::AllSuccess.is_satisfied(&[]));
    }

    #[test]
    fn skips_are_not_failures() {
        assert!(TriggerRule::NoneFailed.is_satisfied(&[Success, Skipped]));
        assert!(TriggerRule::NoneFailedMinOneSuccess.is_satisfied(&[Success, Skipped]));
        assert!(!TriggerRule::NoneFailedMinOneSuccess.is_satisfied(&[Skipped, Skipped]));
        assert!(!TriggerRule::AllSuccess.is_satisfied(&[Success, Skipped]));
    }

    #[test]
    fn upstream_failed_counts_as_failure() {
        assert!(TriggerRule::OneFailed.is_satisfied(&[Success, UpstreamFailed]));
        assert!(TriggerRule::AllFailed.is_satisfied(&[Failed, UpstreamFailed]));
        assert!(!TriggerRule::NoneFailed.is_satisfied(&[UpstreamFailed]));
    }

    #[test]
    fn serde_names_match_display() {
        let json = serde_json::to_string(&TriggerRule::NoneFailedMinOneSuccess).unwrap();
        assert_eq!(json, format!("\"{}\"", TriggerRule::NoneFailedMinOneSuccess));
    }
}
