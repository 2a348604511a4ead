//! Notifier that only emits a tracing record. Used when no gateway is
//! configured so that result dispatch still succeeds and stays observable.

use crate::traits::{Message, Notifier, NotifyError};

#[derive(Debug, Clone)]
pub struct LogNotifier {
    name: String,
}

impl LogNotifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        tracing::info!(
            channel = %self.name,
            recipients = ?message.recipients,
            body = %message.body.as_plain_text(),
            "message (log only)"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}
