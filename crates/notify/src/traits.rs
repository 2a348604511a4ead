//! Notifier trait definition and shared message types.

use serde::Serialize;

/// Errors that can occur during message delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected message: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// Delivery channel families an analytic can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Chat,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Chat => write!(f, "chat"),
        }
    }
}

/// A structured card for chat spaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub title: String,
    pub subtitle: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    Card(Card),
}

impl MessageBody {
    /// Flatten to plain text for channels without rich formatting.
    pub fn as_plain_text(&self) -> String {
        match self {
            MessageBody::Text(text) => text.clone(),
            MessageBody::Card(card) => match &card.subtitle {
                Some(subtitle) => format!("{}\n{}\n{}", card.title, subtitle, card.text),
                None => format!("{}\n{}", card.title, card.text),
            },
        }
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Phone numbers for SMS, space ids for chat. Channels that post to a
    /// fixed destination ignore this.
    pub recipients: Vec<String>,
    pub body: MessageBody,
}

impl Message {
    pub fn text(recipients: Vec<String>, text: impl Into<String>) -> Self {
        Self {
            recipients,
            body: MessageBody::Text(text.into()),
        }
    }
}

/// Trait for delivery channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message through this channel.
    async fn send(&self, message: &Message) -> Result<(), NotifyError>;

    /// Human-readable name for this notifier (e.g., "sms", "chat").
    fn channel_name(&self) -> &str;
}

/// Result of delivering a message through a single notifier.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
