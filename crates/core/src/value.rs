use serde::{Deserialize, Serialize};

use crate::time::EpochMillis;

/// One point of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub date: EpochMillis,
    pub value: f64,
}

impl Sample {
    pub fn new(date: EpochMillis, value: f64) -> Self {
        Self { date, value }
    }
}

/// Runtime value flowing between analytic steps.
///
/// Serialized untagged so that analytic parameters and fixtures can be written
/// as plain JSON/YAML scalars and arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    Series(Vec<Sample>),
    List(Vec<Value>),
}

impl Value {
    /// Numeric view: booleans map to 0/1, numeric text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Series(_) | Value::List(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0 && !n.is_nan()),
            Value::Text(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Value::Series(_) | Value::List(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[Sample]> {
        match self {
            Value::Series(samples) => Some(samples),
            _ => None,
        }
    }

    /// Whether the value should fire a conditional side effect.
    ///
    /// Collections are truthy regardless of content; text is truthy unless
    /// empty or the literal `false`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty() && s != "false",
            Value::Series(_) | Value::List(_) => true,
        }
    }

    /// Type an attribute stored as text: numbers and booleans are recognized,
    /// everything else stays text.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(n) if !trimmed.is_empty() => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Series(_) => "series",
            Value::List(_) => "list",
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<Sample>> for Value {
    fn from(samples: Vec<Sample>) -> Self {
        Value::Series(samples)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{s}"),
            Value::Series(samples) => {
                let parts: Vec<String> = samples.iter().map(|s| format_number(s.value)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}
