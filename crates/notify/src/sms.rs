//! HTTP SMS gateway notifier.
//!
//! Posts `{ "from", "to", "text" }` JSON to a gateway endpoint, one request
//! per message with every recipient in `to`.

use crate::env::resolve_env_vars;
use crate::traits::{Message, Notifier, NotifyError};

#[derive(Debug)]
pub struct SmsNotifier {
    gateway_url: String,
    api_key: Option<String>,
    sender: Option<String>,
    client: reqwest::Client,
}

impl SmsNotifier {
    /// `${VAR}` references in the URL and API key are resolved eagerly.
    pub fn from_config(
        gateway_url: String,
        api_key: Option<String>,
        sender: Option<String>,
    ) -> Result<Self, NotifyError> {
        let gateway_url = resolve_env_vars(&gateway_url)?;
        if gateway_url.is_empty() {
            return Err(NotifyError::Config(
                "SMS gateway URL must not be empty".to_string(),
            ));
        }
        let api_key = api_key.map(|k| resolve_env_vars(&k)).transpose()?;

        Ok(Self {
            gateway_url,
            api_key,
            sender,
            client: reqwest::Client::new(),
        })
    }
}

pub(crate) fn sms_payload(sender: Option<&str>, message: &Message) -> serde_json::Value {
    serde_json::json!({
        "from": sender,
        "to": message.recipients,
        "text": message.body.as_plain_text(),
    })
}

#[async_trait::async_trait]
impl Notifier for SmsNotifier {
    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        if message.recipients.is_empty() {
            return Err(NotifyError::Config("SMS message has no recipients".to_string()));
        }

        let mut request = self
            .client
            .post(&self.gateway_url)
            .json(&sms_payload(self.sender.as_deref(), message));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(%status, body = %body_text, "SMS gateway returned non-2xx status");
            return Err(NotifyError::Rejected(format!("{status}: {body_text}")));
        }

        tracing::info!(recipients = message.recipients.len(), "SMS sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "sms"
    }
}
