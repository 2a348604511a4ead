//! Execution-time generation: catch-up after downtime and fine-grained
//! timestamps inside one aggregate window.
//!
//! All functions are pure in `(trigger, last, now)`. A malformed cron
//! expression or interval is logged and yields no times. Enumerations stop
//! at `max_ticks` entries.

use cron::Schedule;
use tracing::warn;
use vigil_core::{millis_to_datetime, EpochMillis};

use super::cron::parse_schedule;
use crate::schema::Trigger;

/// Parsed form of a trigger.
enum Ticks {
    Cron(Schedule),
    Interval(i64),
}

impl Ticks {
    fn parse(trigger: &Trigger) -> Option<Self> {
        match trigger {
            Trigger::Cron { expression } => parse_schedule(expression).map(Ticks::Cron),
            Trigger::Interval { every } => match every.millis() {
                Some(ms) => Some(Ticks::Interval(ms)),
                None => {
                    warn!(interval = ?every, "invalid interval");
                    None
                }
            },
        }
    }

    /// Occurrences strictly after `after`, ascending.
    fn after(&self, after: EpochMillis) -> Box<dyn Iterator<Item = EpochMillis> + '_> {
        match self {
            Ticks::Cron(schedule) => match millis_to_datetime(after) {
                Ok(start) => Box::new(schedule.after(&start).map(|dt| dt.timestamp_millis())),
                Err(_) => Box::new(std::iter::empty()),
            },
            Ticks::Interval(every) => {
                let every = *every;
                Box::new(std::iter::successors(after.checked_add(every), move |t| {
                    t.checked_add(every)
                }))
            }
        }
    }
}

/// First `max_ticks` items; the flag is set when more were available.
fn capped(iter: impl Iterator<Item = EpochMillis>, max_ticks: usize) -> (Vec<EpochMillis>, bool) {
    let mut times: Vec<EpochMillis> = iter.take(max_ticks.saturating_add(1)).collect();
    let truncated = times.len() > max_ticks;
    times.truncate(max_ticks);
    (times, truncated)
}

/// Occurrences in `(last, now]` except the final one, which the caller
/// replaces with [`current_tick`]. Strictly increasing, every value is
/// `> last` and `< now`.
pub fn missed_times(
    trigger: &Trigger,
    last: EpochMillis,
    now: EpochMillis,
    max_ticks: usize,
) -> Vec<EpochMillis> {
    let Some(ticks) = Ticks::parse(trigger) else {
        return Vec::new();
    };
    // One extra slot for the final occurrence that gets dropped.
    let (mut times, truncated) = capped(
        ticks.after(last).take_while(|t| *t <= now),
        max_ticks.saturating_add(1),
    );
    if truncated {
        warn!(%trigger, max_ticks, "missed executions truncated");
        times.truncate(max_ticks);
    } else {
        times.pop();
    }
    times
}

/// The tick the current run stands for: the most recent cron occurrence in
/// `(last, now]`, or `now` for intervals and when no occurrence exists.
pub fn current_tick(trigger: &Trigger, last: EpochMillis, now: EpochMillis) -> EpochMillis {
    match Ticks::parse(trigger) {
        Some(ticks @ Ticks::Cron(_)) => latest_at_or_before(&ticks, last, now).unwrap_or(now),
        _ => now,
    }
}

/// Latest occurrence in `(floor, now]`, searched backwards from `now` with a
/// doubling window so sparse schedules do not enumerate the whole range.
fn latest_at_or_before(ticks: &Ticks, floor: EpochMillis, now: EpochMillis) -> Option<EpochMillis> {
    let mut span: i64 = 1_000;
    loop {
        let from = now.saturating_sub(span).max(floor);
        if let Some(latest) = ticks.after(from).take_while(|t| *t <= now).last() {
            return Some(latest);
        }
        if from == floor {
            return None;
        }
        span = span.saturating_mul(2);
    }
}

/// Whether at least one occurrence falls in `(last, now]`.
pub fn is_due(trigger: &Trigger, last: EpochMillis, now: EpochMillis) -> bool {
    Ticks::parse(trigger)
        .and_then(|ticks| ticks.after(last).next())
        .is_some_and(|next| next <= now)
}

/// Every execution time a catch-up run must cover: the missed times plus
/// the current tick. Empty when nothing is due.
pub fn catch_up_times(
    trigger: &Trigger,
    last: EpochMillis,
    now: EpochMillis,
    max_ticks: usize,
) -> Vec<EpochMillis> {
    if !is_due(trigger, last, now) {
        return Vec::new();
    }
    let mut times = missed_times(trigger, last, now, max_ticks);
    let tick = current_tick(trigger, last, now);
    if times.last().map_or(true, |t| *t < tick) {
        times.push(tick);
    }
    times
}

/// Next occurrence of the aggregate cron strictly after `last`.
pub fn next_aggregate_boundary(aggregate_cron: &str, last: EpochMillis) -> Option<EpochMillis> {
    Ticks::Cron(parse_schedule(aggregate_cron)?).after(last).next()
}

/// Fine trigger occurrences strictly between `last` and the next aggregate
/// boundary after `last`.
pub fn aggregate_times(
    aggregate_cron: &str,
    fine: &Trigger,
    last: EpochMillis,
    max_ticks: usize,
) -> Vec<EpochMillis> {
    let Some(boundary) = next_aggregate_boundary(aggregate_cron, last) else {
        return Vec::new();
    };
    let Some(ticks) = Ticks::parse(fine) else {
        return Vec::new();
    };
    let (times, truncated) = capped(ticks.after(last).take_while(|t| *t < boundary), max_ticks);
    if truncated {
        warn!(aggregate = %aggregate_cron, fine = %fine, max_ticks, "aggregate window truncated");
    }
    times
}
