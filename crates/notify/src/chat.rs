//! Chat-space incoming-webhook notifier.
//!
//! Text messages are posted as `{ "text": ... }`; cards use the `cardsV2`
//! envelope with a header and a single text paragraph.

use crate::env::resolve_env_vars;
use crate::traits::{Card, Message, MessageBody, Notifier, NotifyError};

#[derive(Debug)]
pub struct ChatNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl ChatNotifier {
    pub fn from_config(webhook_url: String) -> Result<Self, NotifyError> {
        let webhook_url = resolve_env_vars(&webhook_url)?;
        if webhook_url.is_empty() {
            return Err(NotifyError::Config(
                "chat webhook URL must not be empty".to_string(),
            ));
        }
        Ok(Self {
            webhook_url,
            client: reqwest::Client::new(),
        })
    }
}

fn card_payload(card: &Card) -> serde_json::Value {
    let mut header = serde_json::json!({ "title": card.title });
    if let Some(subtitle) = &card.subtitle {
        header["subtitle"] = serde_json::Value::String(subtitle.clone());
    }
    serde_json::json!({
        "cardsV2": [{
            "cardId": "vigil-analytic",
            "card": {
                "header": header,
                "sections": [{
                    "widgets": [{ "textParagraph": { "text": card.text } }]
                }]
            }
        }]
    })
}

pub(crate) fn chat_payload(message: &Message) -> serde_json::Value {
    match &message.body {
        MessageBody::Text(text) => serde_json::json!({ "text": text }),
        MessageBody::Card(card) => card_payload(card),
    }
}

#[async_trait::async_trait]
impl Notifier for ChatNotifier {
    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&chat_payload(message))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(%status, body = %body_text, "chat webhook returned non-2xx status");
            return Err(NotifyError::Rejected(format!("{status}: {body_text}")));
        }

        tracing::debug!(%status, "chat message delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload() {
        let payload = chat_payload(&Message::text(vec![], "CO2 too high"));
        assert_eq!(payload, serde_json::json!({ "text": "CO2 too high" }));
    }

    #[test]
    fn card_payload_has_header_and_paragraph() {
        let message = Message {
            recipients: vec![],
            body: MessageBody::Card(Card {
                title: "CO2 alert".to_string(),
                subtitle: Some("Meeting room".to_string()),
                text: "1200 ppm".to_string(),
            }),
        };
        let payload = chat_payload(&message);
        let card = &payload["cardsV2"][0]["card"];
        assert_eq!(card["header"]["title"], "CO2 alert");
        assert_eq!(card["header"]["subtitle"], "Meeting room");
        assert_eq!(card["sections"][0]["widgets"][0]["textParagraph"]["text"], "1200 ppm");
    }

    #[test]
    fn card_without_subtitle_omits_it() {
        let payload = card_payload(&Card {
            title: "t".to_string(),
            subtitle: None,
            text: "x".to_string(),
        });
        assert!(payload["cardsV2"][0]["card"]["header"].get("subtitle").is_none());
    }

    #[test]
    fn empty_webhook_rejected() {
        assert!(ChatNotifier::from_config(String::new()).is_err());
    }
}
