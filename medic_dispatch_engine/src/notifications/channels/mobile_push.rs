use async_trait::async_trait;
use log::*;
use serde::Deserialize;
use serde_json::json;

use super::{build_client, classify_status, ChannelError, DeliveryOutcome, NotificationChannel};
use crate::{db_types::ChannelKind, notifications::Notification};

/// Mobile push through a push gateway. The endpoint is the device token the app registered.
#[derive(Clone)]
pub struct MobilePushChannel {
    client: reqwest::Client,
    gateway_url: String,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    data: PushTicket,
}

#[derive(Debug, Deserialize)]
struct PushTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<TicketDetails>,
}

#[derive(Debug, Deserialize)]
struct TicketDetails {
    #[serde(default)]
    error: Option<String>,
}

impl MobilePushChannel {
    pub fn new(gateway_url: &str) -> Result<Self, ChannelError> {
        let client = build_client(ChannelKind::MobilePush)?;
        Ok(Self { client, gateway_url: gateway_url.to_string() })
    }
}

/// A 2xx reply must still carry a ticket. Anything else means the gateway is misbehaving, so the send is retried.
fn classify_body(body: &[u8]) -> DeliveryOutcome {
    match serde_json::from_slice::<GatewayResponse>(body) {
        Ok(response) => classify_ticket(response.data),
        Err(e) => {
            warn!("🔔️ The push gateway accepted a message but its reply could not be read: {e}");
            DeliveryOutcome::TransientFailure(format!("Unreadable gateway reply. {e}"))
        },
    }
}

fn classify_ticket(ticket: PushTicket) -> DeliveryOutcome {
    if ticket.status == "ok" {
        return DeliveryOutcome::Delivered;
    }
    let error = ticket.details.and_then(|d| d.error).unwrap_or_default();
    let message = ticket.message.unwrap_or_default();
    if error == "DeviceNotRegistered" {
        DeliveryOutcome::PermanentFailure(format!("{error}: {message}"))
    } else {
        DeliveryOutcome::TransientFailure(format!("{error}: {message}"))
    }
}

#[async_trait]
impl NotificationChannel for MobilePushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::MobilePush
    }

    async fn send(&self, endpoint: &str, notification: &Notification) -> DeliveryOutcome {
        let payload = json!({
            "to": endpoint,
            "title": notification.title,
            "body": notification.body,
            "data": { "order_id": notification.order_id, "status": notification.status },
        });
        let response = match self.client.post(&self.gateway_url).json(&payload).send().await {
            Ok(res) => res,
            Err(e) => return ChannelError::Transport { channel: ChannelKind::MobilePush, reason: e.to_string() }.into(),
        };
        let status = response.status();
        if !status.is_success() {
            return classify_status(status);
        }
        match response.bytes().await {
            Ok(body) => classify_body(&body),
            Err(e) => ChannelError::Transport { channel: ChannelKind::MobilePush, reason: e.to_string() }.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ticket(json: &str) -> PushTicket {
        serde_json::from_str::<GatewayResponse>(json).unwrap().data
    }

    #[test]
    fn unregistered_devices_are_permanent() {
        let t = ticket(
            r#"{"data": {"status": "error", "message": "not a valid token", "details": {"error": "DeviceNotRegistered"}}}"#,
        );
        assert!(matches!(classify_ticket(t), DeliveryOutcome::PermanentFailure(_)));
        let t = ticket(r#"{"data": {"status": "error", "details": {"error": "MessageRateExceeded"}}}"#);
        assert!(matches!(classify_ticket(t), DeliveryOutcome::TransientFailure(_)));
        let t = ticket(r#"{"data": {"status": "ok", "id": "xyz"}}"#);
        assert_eq!(classify_ticket(t), DeliveryOutcome::Delivered);
    }

    #[test]
    fn unreadable_replies_are_retried() {
        assert!(matches!(classify_body(b"<html>Bad gateway</html>"), DeliveryOutcome::TransientFailure(_)));
        assert!(matches!(classify_body(br#"{"data": []}"#), DeliveryOutcome::TransientFailure(_)));
        assert!(matches!(classify_body(b""), DeliveryOutcome::TransientFailure(_)));
        assert_eq!(classify_body(br#"{"data": {"status": "ok"}}"#), DeliveryOutcome::Delivered);
    }
}
