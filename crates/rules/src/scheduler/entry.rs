//! Per-analytic schedule entry types.

use serde::Serialize;
use vigil_core::EpochMillis;

use crate::schema::Trigger;

/// Scheduling state for a single analytic.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    /// Analytic identifier (matches `AnalyticDefinition.id`).
    pub analytic_id: String,
    pub trigger: Trigger,
    /// Aggregate cron window, when the analytic batches fine ticks.
    pub aggregate: Option<String>,
    /// Execution time of the last completed batch.
    pub last_executed: EpochMillis,
    pub enabled: bool,
}

/// Execution times one analytic must cover on this pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBatch {
    pub analytic_id: String,
    pub times: Vec<EpochMillis>,
    /// Value to record as the last execution once the batch completes.
    pub complete_at: EpochMillis,
}
