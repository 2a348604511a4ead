//! Execution triggers.

use serde::{Deserialize, Serialize};

use crate::scheduler::parse_duration;

/// When an analytic runs.
///
/// ```yaml
/// trigger: { type: cron, expression: "*/15 * * * *" }
/// trigger: { type: interval, every: 1h30m }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Trigger {
    Cron { expression: String },
    Interval { every: IntervalSpec },
}

/// Interval length: raw milliseconds or a `1d2h30m15s` duration string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalSpec {
    Millis(i64),
    Duration(String),
}

impl IntervalSpec {
    /// Length in milliseconds, `None` when unparseable or not positive.
    pub fn millis(&self) -> Option<i64> {
        let ms = match self {
            IntervalSpec::Millis(ms) => *ms,
            IntervalSpec::Duration(raw) => match raw.trim().parse::<i64>() {
                Ok(ms) => ms,
                Err(_) => i64::try_from(parse_duration(raw)?.as_millis()).ok()?,
            },
        };
        (ms > 0).then_some(ms)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Cron { expression } => write!(f, "cron '{expression}'"),
            Trigger::Interval { every } => match every {
                IntervalSpec::Millis(ms) => write!(f, "every {ms}ms"),
                IntervalSpec::Duration(raw) => write!(f, "every {raw}"),
            },
        }
    }
}
