//! Cron normalization and duration parsing helpers.

use std::str::FromStr;
use std::time::Duration;

use cron::Schedule;
use tracing::warn;

/// Analytics are authored with classic `min hour dom month dow` cron;
/// the `cron` crate wants a leading seconds field. Five-field expressions
/// fire at second zero; six- and seven-field ones are left untouched.
pub(crate) fn normalize_cron(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => format!("0 {}", fields.join(" ")),
        _ => fields.join(" "),
    }
}

/// Parse a cron expression, logging and returning `None` when malformed.
pub(crate) fn parse_schedule(expression: &str) -> Option<Schedule> {
    let normalized = normalize_cron(expression);
    match Schedule::from_str(&normalized) {
        Ok(schedule) => Some(schedule),
        Err(e) => {
            warn!(cron = %expression, error = %e, "invalid cron expression");
            None
        }
    }
}

/// Parse a `1d2h30m15s`-style duration. Every number needs a unit
/// (`d`, `h`, `m`, `s`); components may repeat and appear in any order.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit_secs = match ch {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        let n: u64 = std::mem::take(&mut digits).parse().ok()?;
        total = total.checked_add(n.checked_mul(unit_secs)?)?;
    }

    if !digits.is_empty() {
        return None;
    }
    Some(Duration::from_secs(total))
}
