//! Time-window normalization of raw series samples.
//!
//! With boundary injection a window `[start, end]` is forward-filled at both
//! ends: a sample is synthesized at `start` from the last value before the
//! window, and at `end` from the last value inside it.

use vigil_core::{EpochMillis, Sample};

/// Normalize raw samples for the window `[start, end]`.
///
/// `raw` may contain samples before `start` (the "last known value").
/// Without injection the samples are returned unchanged.
pub fn normalize(start: EpochMillis, end: EpochMillis, inject: bool, raw: Vec<Sample>) -> Vec<Sample> {
    if !inject {
        return raw;
    }

    let deduped = ordered(raw);

    let previous = deduped.iter().rev().find(|s| s.date < start).copied();
    let mut window: Vec<Sample> = deduped
        .into_iter()
        .filter(|s| s.date >= start && s.date <= end)
        .collect();

    match (window.first().copied(), previous) {
        (None, Some(prev)) => {
            window.push(Sample::new(start, prev.value));
        }
        (Some(first), Some(prev)) if first.date > start => {
            window.insert(0, Sample::new(start, prev.value));
        }
        _ => {}
    }

    if let Some(last) = window.last().copied() {
        if last.date < end {
            window.push(Sample::new(end, last.value));
        }
    }

    window
}

/// Extract the window for one execution time from a union fetch that covers
/// several windows, then apply the same normalization.
pub fn slice(start: EpochMillis, end: EpochMillis, inject: bool, union: &[Sample]) -> Vec<Sample> {
    if !inject {
        return union
            .iter()
            .filter(|s| s.date >= start && s.date <= end)
            .copied()
            .collect();
    }
    if !union.windows(2).all(|w| w[0].date < w[1].date) {
        return normalize(start, end, true, union.to_vec());
    }
    // The last sample before the window is enough history for injection.
    let first_in_window = union.partition_point(|s| s.date < start);
    let from = first_in_window.saturating_sub(1);
    let to = union.partition_point(|s| s.date <= end);
    let candidates = union.get(from..to.max(from)).unwrap_or_default().to_vec();
    normalize(start, end, true, candidates)
}

/// Raw samples sorted by date, keeping the last write for equal dates.
pub fn ordered(mut raw: Vec<Sample>) -> Vec<Sample> {
    raw.sort_by_key(|s| s.date);
    dedup_last_wins(raw)
}

/// Samples sorted by date; for equal dates the last one is kept.
fn dedup_last_wins(sorted: Vec<Sample>) -> Vec<Sample> {
    let mut out: Vec<Sample> = Vec::with_capacity(sorted.len());
    for sample in sorted {
        match out.last_mut() {
            Some(last) if last.date == sample.date => *last = sample,
            _ => out.push(sample),
        }
    }
    out
}
