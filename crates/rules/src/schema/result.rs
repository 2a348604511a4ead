//! Result categories and the record produced per `(entity, execution time)`.

use serde::{Deserialize, Serialize};
use vigil_core::Value;

/// Side effect applied with an analytic's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    Ticket,
    Alarm,
    ControlEndpoint,
    Endpoint,
    #[serde(rename = "SMS")]
    Sms,
    ChatMessage,
    ChatCard,
    AttributeWrite,
    Log,
}

impl ResultType {
    /// Result types that only fire when the output is truthy.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            ResultType::Ticket
                | ResultType::Alarm
                | ResultType::Sms
                | ResultType::ChatMessage
                | ResultType::ChatCard
        )
    }
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultType::Ticket => "Ticket",
            ResultType::Alarm => "Alarm",
            ResultType::ControlEndpoint => "ControlEndpoint",
            ResultType::Endpoint => "Endpoint",
            ResultType::Sms => "SMS",
            ResultType::ChatMessage => "ChatMessage",
            ResultType::ChatCard => "ChatCard",
            ResultType::AttributeWrite => "AttributeWrite",
            ResultType::Log => "Log",
        };
        write!(f, "{name}")
    }
}

/// Per-category settings of the result side effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultConfig {
    /// Ticket/alarm workflow context.
    #[serde(default)]
    pub context: Option<String>,
    /// Ticket/alarm workflow process.
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub priority: u8,
    /// Ticket description or message body; `{n}` expands to input `I<n>`.
    #[serde(default)]
    pub message: Option<String>,
    /// Chat card title; `{n}` placeholders are expanded too.
    #[serde(default)]
    pub title: Option<String>,
    /// Phone numbers (SMS) or chat space ids.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Attribute category used by `AttributeWrite`.
    #[serde(default)]
    pub attribute_category: Option<String>,
}

/// Outcome of one `(entity, execution time)` unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticResult {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<ResultType>,
}

impl AnalyticResult {
    pub fn applied(value: Value, result_type: ResultType) -> Self {
        Self {
            success: true,
            error: String::new(),
            result_value: Some(value),
            result_type: Some(result_type),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            result_value: None,
            result_type: None,
        }
    }

    /// Expected early termination through `EXIT`: successful, nothing applied.
    pub fn exited() -> Self {
        Self {
            success: true,
            error: String::new(),
            result_value: None,
            result_type: None,
        }
    }
}
