use async_trait::async_trait;
use log::*;
use mdp_common::Secret;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{build_client, ChannelError, DeliveryOutcome, NotificationChannel};
use crate::{db_types::ChannelKind, notifications::Notification};

/// Chat-bot messages. The endpoint is the chat id the user started a conversation with the bot from.
#[derive(Clone)]
pub struct TelegramChannel {
    client: reqwest::Client,
    api_url: String,
    bot_token: Secret<String>,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramChannel {
    pub fn new(api_url: &str, bot_token: Secret<String>) -> Result<Self, ChannelError> {
        if bot_token.is_empty() {
            return Err(ChannelError::Initialization {
                channel: ChannelKind::Telegram,
                reason: "bot token is empty".into(),
            });
        }
        let client = build_client(ChannelKind::Telegram)?;
        Ok(Self { client, api_url: api_url.trim_end_matches('/').to_string(), bot_token })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token.reveal())
    }
}

/// The bot API answers 403 when the user blocked the bot and 400 "chat not found" when the chat no longer exists.
fn classify(status: StatusCode, description: &str) -> DeliveryOutcome {
    let description = description.to_ascii_lowercase();
    match status {
        s if s.is_success() => DeliveryOutcome::Delivered,
        StatusCode::FORBIDDEN => DeliveryOutcome::PermanentFailure(format!("bot was blocked: {description}")),
        StatusCode::BAD_REQUEST if description.contains("chat not found") => {
            DeliveryOutcome::PermanentFailure(description)
        },
        s => DeliveryOutcome::TransientFailure(format!("bot API returned {s}: {description}")),
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send(&self, endpoint: &str, notification: &Notification) -> DeliveryOutcome {
        let payload = json!({ "chat_id": endpoint, "text": notification.as_text() });
        let response = match self.client.post(self.send_message_url()).json(&payload).send().await {
            Ok(res) => res,
            Err(e) => {
                // reqwest errors carry the URL, which carries the token
                let reason = e.without_url().to_string();
                return ChannelError::Transport { channel: ChannelKind::Telegram, reason }.into();
            },
        };
        let status = response.status();
        let body = response.json::<BotApiResponse>().await.ok();
        let description = body.as_ref().and_then(|b| b.description.clone()).unwrap_or_default();
        if status.is_success() && !body.map_or(true, |b| b.ok) {
            return DeliveryOutcome::TransientFailure(format!("bot API refused the message: {description}"));
        }
        trace!("🔔️ Bot API returned {status}");
        classify(status, &description)
    }
}
