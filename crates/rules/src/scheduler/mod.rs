//! Execution-time scheduling for analytics.
//!
//! [`times`] turns a trigger and the last execution time into the list of
//! execution timestamps to evaluate: every tick missed while the worker was
//! down plus the current one, or every fine tick of one aggregate window.
//! [`AnalyticScheduler`] keeps the per-analytic last-execution book the
//! worker drives.
//!
//! The last execution time is owned by the caller: nothing here advances it
//! until [`AnalyticScheduler::record_execution`] is called after a batch.

mod core;
pub(crate) mod cron;
mod entry;
pub mod times;


pub use self::core::AnalyticScheduler;
pub use self::cron::parse_duration;
pub use self::entry::{PendingBatch, ScheduleEntry};
pub use self::times::{
    aggregate_times, catch_up_times, current_tick, is_due, missed_times, next_aggregate_boundary,
};
