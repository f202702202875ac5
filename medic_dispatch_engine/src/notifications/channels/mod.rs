//! Delivery channels.
//!
//! Each channel knows how to send one [`Notification`] to one endpoint, and how to tell a temporary failure from an
//! endpoint that is gone for good.
mod mobile_push;
mod telegram;
mod web_push;

use async_trait::async_trait;
pub use mobile_push::MobilePushChannel;
use reqwest::StatusCode;
pub use telegram::TelegramChannel;
use thiserror::Error;
pub use web_push::WebPushChannel;

use crate::{db_types::ChannelKind, notifications::Notification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Worth trying again with the next event.
    TransientFailure(String),
    /// The endpoint is gone. Its subscription should be deleted.
    PermanentFailure(String),
}

#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("Could not initialise the {channel} channel: {reason}")]
    Initialization { channel: ChannelKind, reason: String },
    #[error("Could not reach the {channel} endpoint: {reason}")]
    Transport { channel: ChannelKind, reason: String },
}

impl From<ChannelError> for DeliveryOutcome {
    fn from(e: ChannelError) -> Self {
        DeliveryOutcome::TransientFailure(e.to_string())
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Sends `notification` to one endpoint. Never fails; all errors are folded into the outcome.
    async fn send(&self, endpoint: &str, notification: &Notification) -> DeliveryOutcome;
}

/// The default reading of an HTTP status: 2xx is delivered, 404 and 410 mean the endpoint is gone, anything else is
/// transient.
pub(crate) fn classify_status(status: StatusCode) -> DeliveryOutcome {
    if status.is_success() {
        DeliveryOutcome::Delivered
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        DeliveryOutcome::PermanentFailure(format!("endpoint returned {status}"))
    } else {
        DeliveryOutcome::TransientFailure(format!("endpoint returned {status}"))
    }
}

pub(crate) fn build_client(channel: ChannelKind) -> Result<reqwest::Client, ChannelError> {
    reqwest::Client::builder()
        .user_agent(concat!("medic-dispatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ChannelError::Initialization { channel, reason: e.to_string() })
}
