use async_trait::async_trait;
use log::*;
use serde_json::json;

use super::{build_client, classify_status, ChannelError, DeliveryOutcome, NotificationChannel};
use crate::{db_types::ChannelKind, notifications::Notification};

/// Browser push. The endpoint is the push-service URL the browser handed out when the user opted in.
#[derive(Clone)]
pub struct WebPushChannel {
    client: reqwest::Client,
    ttl_secs: u64,
}

impl WebPushChannel {
    pub fn new(ttl_secs: u64) -> Result<Self, ChannelError> {
        let client = build_client(ChannelKind::WebPush)?;
        Ok(Self { client, ttl_secs })
    }
}

#[async_trait]
impl NotificationChannel for WebPushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WebPush
    }

    async fn send(&self, endpoint: &str, notification: &Notification) -> DeliveryOutcome {
        let payload = json!({
            "title": notification.title,
            "body": notification.body,
            "order_id": notification.order_id,
            "status": notification.status,
        });
        let response =
            self.client.post(endpoint).header("TTL", self.ttl_secs.to_string()).json(&payload).send().await;
        match response {
            Ok(res) => {
                trace!("🔔️ Web push returned {}", res.status());
                classify_status(res.status())
            },
            Err(e) => ChannelError::Transport { channel: ChannelKind::WebPush, reason: e.to_string() }.into(),
        }
    }
}
