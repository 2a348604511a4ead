//! Built-in algorithm catalog.
//!
//! Aggregations over an empty input are undefined (`Ok(None)`); threshold
//! checks over an empty input are `false`.

use vigil_core::Value;

use super::math::{
    booleans, first_series, loosely_equal, mean, number_param, numbers, scalars, std_dev,
    time_weighted_average, truthy_duration,
};
use super::{AlgorithmSpec, Params, ValueKind, EXIT};
use crate::error::AlgorithmError;

type Output = Result<Option<Value>, AlgorithmError>;

macro_rules! spec {
    ($name:expr, $desc:expr, $input:ident -> $output:ident, [$($param:expr),*], $run:expr) => {
        AlgorithmSpec {
            name: $name,
            description: $desc,
            input: ValueKind::$input,
            output: ValueKind::$output,
            parameters: &[$($param),*],
            run: $run,
        }
    };
}

pub(super) fn builtins() -> Vec<AlgorithmSpec> {
    vec![
        spec!("COPY_FIRST", "First scalar of the inputs", Any -> Any, [], copy_first),
        spec!("COPY_LAST", "Last scalar of the inputs", Any -> Any, [], copy_last),
        spec!("AVERAGE", "Arithmetic mean", Number -> Number, [], average),
        spec!("MAX", "Largest value", Number -> Number, [], max),
        spec!("MIN", "Smallest value", Number -> Number, [], min),
        spec!("SUM", "Sum of values", Number -> Number, [], sum),
        spec!("SUBTRACTION", "First value minus the others", Number -> Number, [], subtraction),
        spec!("MULTIPLICATION", "Product of values", Number -> Number, [], multiplication),
        spec!("DIVISION", "First value divided by the others", Number -> Number, [], division),
        spec!("STANDARD_DEVIATION", "Population standard deviation", Number -> Number, [], standard_deviation),
        spec!("TIME_WEIGHTED_AVERAGE", "Average of a series, each sample held until the next", Series -> Number, [], time_weighted),
        spec!("INTEGRAL_BOOLEAN", "Milliseconds a series held a non-zero value", Series -> Number, [], integral_boolean),
        spec!("THRESHOLD_ABOVE", "Any value above p1", Number -> Boolean, ["p1"], threshold_above),
        spec!("THRESHOLD_BELOW", "Any value below p1", Number -> Boolean, ["p1"], threshold_below),
        spec!("THRESHOLD_BETWEEN_IN", "Any value within [p1, p2]", Number -> Boolean, ["p1", "p2"], threshold_between_in),
        spec!("THRESHOLD_BETWEEN_OUT", "Any value outside [p1, p2]", Number -> Boolean, ["p1", "p2"], threshold_between_out),
        spec!("EQUAL_TO", "Any value equal to p1", Any -> Boolean, ["p1"], equal_to),
        spec!("DIFFERENCE_THRESHOLD", "Absolute change from first to last value above p1", Number -> Boolean, ["p1"], difference_threshold),
        spec!("AND", "Logical and", Boolean -> Boolean, [], and),
        spec!("OR", "Logical or", Boolean -> Boolean, [], or),
        spec!("NOT", "Logical negation of a single value", Boolean -> Boolean, [], not),
        spec!("XOR", "True when an odd number of inputs are true", Boolean -> Boolean, [], xor),
        spec!("CONV_BOOLEAN_TO_NUMBER", "true -> 1, false -> 0", Boolean -> Number, [], bool_to_number),
        spec!("CONV_NUMBER_TO_BOOLEAN", "Non-zero -> true", Number -> Boolean, [], number_to_bool),
        spec!(EXIT, "Abort the evaluation when any input is truthy", Any -> Boolean, [], exit),
    ]
}

fn copy_first(inputs: &[Value], _: &Params) -> Output {
    Ok(scalars(inputs).into_iter().next())
}

fn copy_last(inputs: &[Value], _: &Params) -> Output {
    Ok(scalars(inputs).into_iter().last())
}

fn average(inputs: &[Value], _: &Params) -> Output {
    Ok(mean(&numbers("AVERAGE", inputs)?).map(Value::Number))
}

fn max(inputs: &[Value], _: &Params) -> Output {
    Ok(numbers("MAX", inputs)?
        .into_iter()
        .reduce(f64::max)
        .map(Value::Number))
}

fn min(inputs: &[Value], _: &Params) -> Output {
    Ok(numbers("MIN", inputs)?
        .into_iter()
        .reduce(f64::min)
        .map(Value::Number))
}

fn sum(inputs: &[Value], _: &Params) -> Output {
    let values = numbers("SUM", inputs)?;
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(Value::Number(values.iter().sum())))
}

fn subtraction(inputs: &[Value], _: &Params) -> Output {
    let values = numbers("SUBTRACTION", inputs)?;
    let Some((first, rest)) = values.split_first() else {
        return Ok(None);
    };
    Ok(Some(Value::Number(first - rest.iter().sum::<f64>())))
}

fn multiplication(inputs: &[Value], _: &Params) -> Output {
    Ok(numbers("MULTIPLICATION", inputs)?
        .into_iter()
        .reduce(|a, b| a * b)
        .map(Value::Number))
}

/// Division by zero is undefined.
fn division(inputs: &[Value], _: &Params) -> Output {
    let values = numbers("DIVISION", inputs)?;
    let Some((first, rest)) = values.split_first() else {
        return Ok(None);
    };
    let divisor: f64 = rest.iter().product();
    if divisor == 0.0 {
        return Ok(None);
    }
    Ok(Some(Value::Number(first / divisor)))
}

fn standard_deviation(inputs: &[Value], _: &Params) -> Output {
    Ok(std_dev(&numbers("STANDARD_DEVIATION", inputs)?).map(Value::Number))
}

fn time_weighted(inputs: &[Value], _: &Params) -> Output {
    let samples = first_series("TIME_WEIGHTED_AVERAGE", inputs)?;
    Ok(time_weighted_average(samples).map(Value::Number))
}

fn integral_boolean(inputs: &[Value], _: &Params) -> Output {
    let samples = first_series("INTEGRAL_BOOLEAN", inputs)?;
    Ok(Some(Value::Number(truthy_duration(samples) as f64)))
}

fn any_number(
    algorithm: &str,
    inputs: &[Value],
    predicate: impl Fn(f64) -> bool,
) -> Output {
    let hit = numbers(algorithm, inputs)?.into_iter().any(predicate);
    Ok(Some(Value::Bool(hit)))
}

fn threshold_above(inputs: &[Value], params: &Params) -> Output {
    let limit = number_param("THRESHOLD_ABOVE", params, "p1")?;
    any_number("THRESHOLD_ABOVE", inputs, |v| v > limit)
}

fn threshold_below(inputs: &[Value], params: &Params) -> Output {
    let limit = number_param("THRESHOLD_BELOW", params, "p1")?;
    any_number("THRESHOLD_BELOW", inputs, |v| v < limit)
}

fn bounds(algorithm: &str, params: &Params) -> Result<(f64, f64), AlgorithmError> {
    let a = number_param(algorithm, params, "p1")?;
    let b = number_param(algorithm, params, "p2")?;
    Ok((a.min(b), a.max(b)))
}

fn threshold_between_in(inputs: &[Value], params: &Params) -> Output {
    let (low, high) = bounds("THRESHOLD_BETWEEN_IN", params)?;
    any_number("THRESHOLD_BETWEEN_IN", inputs, |v| v >= low && v <= high)
}

fn threshold_between_out(inputs: &[Value], params: &Params) -> Output {
    let (low, high) = bounds("THRESHOLD_BETWEEN_OUT", params)?;
    any_number("THRESHOLD_BETWEEN_OUT", inputs, |v| v < low || v > high)
}

fn equal_to(inputs: &[Value], params: &Params) -> Output {
    let expected = params
        .get("p1")
        .ok_or_else(|| AlgorithmError::MissingParameter {
            algorithm: "EQUAL_TO".to_string(),
            param: "p1".to_string(),
        })?;
    let hit = scalars(inputs).iter().any(|v| loosely_equal(v, expected));
    Ok(Some(Value::Bool(hit)))
}

fn difference_threshold(inputs: &[Value], params: &Params) -> Output {
    let limit = number_param("DIFFERENCE_THRESHOLD", params, "p1")?;
    let values = numbers("DIFFERENCE_THRESHOLD", inputs)?;
    let hit = match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => (last - first).abs() > limit,
        _ => false,
    };
    Ok(Some(Value::Bool(hit)))
}

fn and(inputs: &[Value], _: &Params) -> Output {
    let values = booleans("AND", inputs)?;
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(Value::Bool(values.into_iter().all(|b| b))))
}

fn or(inputs: &[Value], _: &Params) -> Output {
    let values = booleans("OR", inputs)?;
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(Value::Bool(values.into_iter().any(|b| b))))
}

fn xor(inputs: &[Value], _: &Params) -> Output {
    let values = booleans("XOR", inputs)?;
    if values.is_empty() {
        return Ok(None);
    }
    let trues = values.into_iter().filter(|b| *b).count();
    Ok(Some(Value::Bool(trues % 2 == 1)))
}

fn not(inputs: &[Value], _: &Params) -> Output {
    match booleans("NOT", inputs)?.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(Value::Bool(!single))),
        many => Err(AlgorithmError::InvalidInput {
            algorithm: "NOT".to_string(),
            reason: format!("expected one value, got {}", many.len()),
        }),
    }
}

fn bool_to_number(inputs: &[Value], _: &Params) -> Output {
    let values = booleans("CONV_BOOLEAN_TO_NUMBER", inputs)?;
    Ok(values
        .first()
        .map(|b| Value::Number(if *b { 1.0 } else { 0.0 })))
}

fn number_to_bool(inputs: &[Value], _: &Params) -> Output {
    let values = numbers("CONV_NUMBER_TO_BOOLEAN", inputs)?;
    Ok(values.first().map(|n| Value::Bool(*n != 0.0)))
}

fn exit(inputs: &[Value], _: &Params) -> Output {
    Ok(Some(Value::Bool(inputs.iter().any(Value::is_truthy))))
}
