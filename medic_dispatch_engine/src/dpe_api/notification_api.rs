use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::SubscriptionStore,
    db_types::{ChannelKind, NewSubscription, NotificationSubscription, Subscriber},
    dpe_api::errors::DispatchError,
};

const MAX_ENDPOINT_LENGTH: usize = 2048;

/// Opt-in and opt-out for push and chat-bot notifications. A subscriber may register any number of endpoints.
pub struct NotificationApi<B> {
    db: B,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B> NotificationApi<B>
where B: SubscriptionStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn subscribe(
        &self,
        subscriber: Subscriber,
        channel: ChannelKind,
        endpoint: &str,
    ) -> Result<NotificationSubscription, DispatchError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(DispatchError::Validation("The endpoint cannot be empty".into()));
        }
        if endpoint.len() > MAX_ENDPOINT_LENGTH {
            return Err(DispatchError::Validation(format!("The endpoint is longer than {MAX_ENDPOINT_LENGTH} bytes")));
        }
        if channel == ChannelKind::WebPush && !endpoint.starts_with("https://") {
            return Err(DispatchError::Validation("Browser push endpoints must be https URLs".into()));
        }
        let subscription = NewSubscription { subscriber, channel, endpoint: endpoint.to_string() };
        let result = self.db.add_subscription(subscription).await?;
        info!("🔔️ {subscriber} subscribed to {channel} (#{})", result.id);
        Ok(result)
    }

    /// Removes one of the subscriber's own endpoints.
    pub async fn unsubscribe(&self, subscriber: Subscriber, subscription_id: i64) -> Result<(), DispatchError> {
        let subscription = self
            .db
            .fetch_subscription(subscription_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("Subscription #{subscription_id}")))?;
        if subscription.subscriber_type != subscriber.kind || subscription.subscriber_id != subscriber.id {
            return Err(DispatchError::Forbidden(format!(
                "Subscription #{subscription_id} does not belong to {subscriber}"
            )));
        }
        self.db.remove_subscription(subscription_id).await?;
        info!("🔔️ {subscriber} unsubscribed from {} (#{subscription_id})", subscription.channel);
        Ok(())
    }

    pub async fn subscriptions(
        &self,
        subscriber: Subscriber,
        channel: ChannelKind,
    ) -> Result<Vec<NotificationSubscription>, DispatchError> {
        Ok(self.db.subscriptions_for(subscriber, channel).await?)
    }
}
