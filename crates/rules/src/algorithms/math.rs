//! Input flattening and numeric helpers shared by the catalog.

use vigil_core::{Sample, Value};

use super::Params;
use crate::error::AlgorithmError;

/// Flatten inputs to scalars: series contribute their sample values, lists
/// are expanded recursively.
pub(super) fn scalars(inputs: &[Value]) -> Vec<Value> {
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        push_scalars(input, &mut out);
    }
    out
}

fn push_scalars(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Series(samples) => out.extend(samples.iter().map(|s| Value::Number(s.value))),
        Value::List(items) => {
            for item in items {
                push_scalars(item, out);
            }
        }
        scalar => out.push(scalar.clone()),
    }
}

pub(super) fn numbers(algorithm: &str, inputs: &[Value]) -> Result<Vec<f64>, AlgorithmError> {
    scalars(inputs)
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| AlgorithmError::InvalidInput {
                algorithm: algorithm.to_string(),
                reason: format!("expected a number, got {} '{v}'", v.kind()),
            })
        })
        .collect()
}

pub(super) fn booleans(algorithm: &str, inputs: &[Value]) -> Result<Vec<bool>, AlgorithmError> {
    scalars(inputs)
        .iter()
        .map(|v| {
            v.as_bool().ok_or_else(|| AlgorithmError::InvalidInput {
                algorithm: algorithm.to_string(),
                reason: format!("expected a boolean, got {} '{v}'", v.kind()),
            })
        })
        .collect()
}

pub(super) fn first_series<'a>(
    algorithm: &str,
    inputs: &'a [Value],
) -> Result<&'a [Sample], AlgorithmError> {
    inputs
        .iter()
        .find_map(Value::as_series)
        .ok_or_else(|| AlgorithmError::InvalidInput {
            algorithm: algorithm.to_string(),
            reason: "expected a time series input".to_string(),
        })
}

pub(super) fn number_param(
    algorithm: &str,
    params: &Params,
    name: &str,
) -> Result<f64, AlgorithmError> {
    let value = params
        .get(name)
        .ok_or_else(|| AlgorithmError::MissingParameter {
            algorithm: algorithm.to_string(),
            param: name.to_string(),
        })?;
    value.as_f64().ok_or_else(|| AlgorithmError::InvalidParameter {
        algorithm: algorithm.to_string(),
        param: name.to_string(),
        reason: format!("expected a number, got '{value}'"),
    })
}

pub(super) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub(super) fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Average where each sample holds until the next one.
///
/// A single sample (or samples sharing one date) averages to the last value.
pub(super) fn time_weighted_average(samples: &[Sample]) -> Option<f64> {
    let first = samples.first()?;
    let last = samples.last()?;
    let span = last.date - first.date;
    if span <= 0 {
        return Some(last.value);
    }
    let weighted: f64 = samples
        .windows(2)
        .map(|w| w[0].value * (w[1].date - w[0].date) as f64)
        .sum();
    Some(weighted / span as f64)
}

/// Milliseconds during which the held value is non-zero.
pub(super) fn truthy_duration(samples: &[Sample]) -> i64 {
    samples
        .windows(2)
        .filter(|w| w[0].value != 0.0 && !w[0].value.is_nan())
        .map(|w| w[1].date - w[0].date)
        .sum()
}

/// Equality for `EQUAL_TO`: numeric when both sides are numeric, textual
/// otherwise.
pub(super) fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => a.to_string() == b.to_string(),
        },
    }
}
