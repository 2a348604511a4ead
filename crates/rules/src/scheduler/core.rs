//! [`AnalyticScheduler`]: last-execution book for all loaded analytics.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use vigil_core::EpochMillis;

use crate::schema::AnalyticDefinition;

use super::entry::{PendingBatch, ScheduleEntry};
use super::times::{aggregate_times, catch_up_times, next_aggregate_boundary};

/// Tracks trigger and last execution time of every loaded analytic.
///
/// Call [`sync`](AnalyticScheduler::sync) whenever the definition set
/// changes. Use [`due`](AnalyticScheduler::due) from the polling loop, run
/// each batch, then [`record_execution`](AnalyticScheduler::record_execution).
#[derive(Debug)]
pub struct AnalyticScheduler {
    entries: HashMap<String, ScheduleEntry>,
    max_ticks: usize,
}

impl AnalyticScheduler {
    pub fn new(max_ticks: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_ticks,
        }
    }

    /// Synchronize entries with the current definitions.
    ///
    /// - New analytics start with `last_executed = now`, so nothing is
    ///   replayed for them.
    /// - Existing entries keep their last execution time.
    /// - Entries of removed analytics are dropped.
    pub fn sync(&mut self, definitions: &[AnalyticDefinition], now: EpochMillis) {
        let current: HashSet<&str> = definitions.iter().map(|d| d.id.as_str()).collect();
        self.entries.retain(|id, _| current.contains(id.as_str()));

        for def in definitions {
            match self.entries.get_mut(&def.id) {
                Some(entry) => {
                    entry.trigger = def.trigger.clone();
                    entry.aggregate = def.aggregate.clone();
                    entry.enabled = def.enabled;
                }
                None => {
                    self.entries.insert(
                        def.id.clone(),
                        ScheduleEntry {
                            analytic_id: def.id.clone(),
                            trigger: def.trigger.clone(),
                            aggregate: def.aggregate.clone(),
                            last_executed: now,
                            enabled: def.enabled,
                        },
                    );
                }
            }
        }
    }

    /// Override the last execution time, e.g. to replay from a given instant.
    pub fn set_last_executed(&mut self, analytic_id: &str, at: EpochMillis) {
        if let Some(entry) = self.entries.get_mut(analytic_id) {
            entry.last_executed = at;
        }
    }

    /// The batch an analytic must run at `now`, if any.
    ///
    /// Aggregated analytics are pending once their window boundary has
    /// passed; the batch then covers every fine tick of that window and
    /// completes at the boundary. Other analytics cover the catch-up times
    /// and complete at the latest of them.
    pub fn pending(&self, analytic_id: &str, now: EpochMillis) -> Option<PendingBatch> {
        let entry = self.entries.get(analytic_id)?;
        if !entry.enabled {
            return None;
        }

        let (times, complete_at) = match &entry.aggregate {
            Some(aggregate) => {
                let boundary = next_aggregate_boundary(aggregate, entry.last_executed)?;
                if boundary > now {
                    return None;
                }
                let times = aggregate_times(
                    aggregate,
                    &entry.trigger,
                    entry.last_executed,
                    self.max_ticks,
                );
                (times, boundary)
            }
            None => {
                let times =
                    catch_up_times(&entry.trigger, entry.last_executed, now, self.max_ticks);
                let complete_at = *times.last()?;
                (times, complete_at)
            }
        };

        debug!(
            analytic = %analytic_id,
            times = times.len(),
            complete_at,
            "batch pending"
        );
        Some(PendingBatch {
            analytic_id: analytic_id.to_string(),
            times,
            complete_at,
        })
    }

    /// Record a completed batch. The last execution time never moves back.
    pub fn record_execution(&mut self, analytic_id: &str, at: EpochMillis) {
        if let Some(entry) = self.entries.get_mut(analytic_id) {
            entry.last_executed = entry.last_executed.max(at);
        }
    }

    /// Every pending batch at `now`, ordered by analytic id.
    pub fn due(&self, now: EpochMillis) -> Vec<PendingBatch> {
        let mut ids: Vec<&String> = self.entries.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| self.pending(id, now))
            .collect()
    }

    pub fn get(&self, analytic_id: &str) -> Option<&ScheduleEntry> {
        self.entries.get(analytic_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AnalyticScheduler {
    fn default() -> Self {
        Self::new(10_000)
    }
}
