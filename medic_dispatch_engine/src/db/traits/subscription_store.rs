use async_trait::async_trait;

use crate::{
    db::errors::StoreError,
    db_types::{ChannelKind, NewSubscription, NotificationSubscription, Subscriber},
};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Registers an endpoint. Registering the same endpoint twice returns the existing record.
    async fn add_subscription(&self, subscription: NewSubscription) -> Result<NotificationSubscription, StoreError>;

    async fn fetch_subscription(&self, id: i64) -> Result<Option<NotificationSubscription>, StoreError>;

    async fn subscriptions_for(
        &self,
        subscriber: Subscriber,
        channel: ChannelKind,
    ) -> Result<Vec<NotificationSubscription>, StoreError>;

    /// Fails with [`StoreError::SubscriptionNotFound`] if there was nothing to delete.
    async fn remove_subscription(&self, id: i64) -> Result<(), StoreError>;
}
