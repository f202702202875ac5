use std::{fmt::Debug, future::Future, pin::Pin, sync::Arc, time::Duration};

use log::*;
use tokio::task::JoinSet;

use crate::{
    db::traits::{ProviderDirectory, SubscriptionStore},
    db_types::{ChannelKind, NotificationSubscription, OrderStatusType, OrderWithLocation, Subscriber},
    events::{EventHooks, OrderPlacedEvent, OrderStatusChangedEvent},
    notifications::{
        channels::{DeliveryOutcome, NotificationChannel},
        messages::{cancellation_for_medic, new_order_message, status_message},
        Notification,
    },
};

/// Who a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Client(i64),
    Medic(i64),
    /// Every medic who is online, approved and not blocked at the moment of sending.
    OnlineProviders,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub attempted: usize,
    pub delivered: usize,
    pub transient_failures: usize,
    pub removed_subscriptions: usize,
}

#[derive(Clone)]
pub struct NotificationRouter<B> {
    db: B,
    channels: Vec<Arc<dyn NotificationChannel>>,
    send_timeout: Duration,
}

impl<B> Debug for NotificationRouter<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds = self.channels.iter().map(|c| c.kind().to_string()).collect::<Vec<_>>().join(", ");
        write!(f, "NotificationRouter [{kinds}]")
    }
}

impl<B> NotificationRouter<B> {
    pub fn new(db: B, send_timeout: Duration) -> Self {
        Self { db, channels: Vec::new(), send_timeout }
    }

    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_kinds(&self) -> Vec<ChannelKind> {
        self.channels.iter().map(|c| c.kind()).collect()
    }
}

impl<B> NotificationRouter<B>
where B: ProviderDirectory + SubscriptionStore + Clone + Send + Sync + 'static
{
    async fn endpoints_for(&self, audience: Audience, channel: ChannelKind) -> Vec<NotificationSubscription> {
        let result = match audience {
            Audience::Client(id) => self.db.subscriptions_for(Subscriber::client(id), channel).await,
            Audience::Medic(id) => self.db.subscriptions_for(Subscriber::medic(id), channel).await,
            Audience::OnlineProviders => self.db.online_provider_endpoints(channel).await,
        };
        result.unwrap_or_else(|e| {
            error!("🔔️ Could not resolve {channel} endpoints for {audience:?}: {e}");
            Vec::new()
        })
    }

    /// Sends `notification` to every endpoint of `audience` on every channel, concurrently.
    ///
    /// Each send runs on its own task and is bounded by the router's timeout, so a channel that hangs or panics only
    /// loses its own delivery. This never fails: problems are logged and counted in the report.
    pub async fn notify(&self, audience: Audience, notification: &Notification) -> FanOutReport {
        let mut sends = JoinSet::new();
        for channel in &self.channels {
            for subscription in self.endpoints_for(audience, channel.kind()).await {
                let channel = Arc::clone(channel);
                let notification = notification.clone();
                let send_timeout = self.send_timeout;
                sends.spawn(async move {
                    let send = channel.send(&subscription.endpoint, &notification);
                    let outcome = tokio::time::timeout(send_timeout, send)
                        .await
                        .unwrap_or_else(|_| DeliveryOutcome::TransientFailure("timed out".into()));
                    (subscription, outcome)
                });
            }
        }
        let mut report = FanOutReport { attempted: sends.len(), ..Default::default() };
        let mut outcomes = Vec::with_capacity(sends.len());
        while let Some(res) = sends.join_next().await {
            match res {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("🔔️ A notification send for {audience:?} did not complete: {e}");
                    report.transient_failures += 1;
                },
            }
        }
        for (subscription, outcome) in outcomes {
            match outcome {
                DeliveryOutcome::Delivered => report.delivered += 1,
                DeliveryOutcome::TransientFailure(reason) => {
                    warn!("🔔️ {} delivery to subscription #{} failed: {reason}", subscription.channel, subscription.id);
                    report.transient_failures += 1;
                },
                DeliveryOutcome::PermanentFailure(reason) => {
                    info!(
                        "🔔️ {} endpoint of subscription #{} is gone ({reason}). Removing it",
                        subscription.channel, subscription.id
                    );
                    match self.db.remove_subscription(subscription.id).await {
                        Ok(()) => report.removed_subscriptions += 1,
                        Err(e) => warn!("🔔️ Could not remove subscription #{}: {e}", subscription.id),
                    }
                },
            }
        }
        debug!("🔔️ Fan-out to {audience:?} complete: {report:?}");
        report
    }

    pub async fn announce_new_order(&self, order: &OrderWithLocation) -> FanOutReport {
        self.notify(Audience::OnlineProviders, &new_order_message(order)).await
    }

    /// Tells the client about the new status. A cancellation is also sent to the medic, if one was bound.
    pub async fn announce_status_change(&self, event: &OrderStatusChangedEvent) -> FanOutReport {
        let order = &event.order;
        let mut report = match status_message(order) {
            Some(message) => self.notify(Audience::Client(order.client_id), &message).await,
            None => FanOutReport::default(),
        };
        if let (OrderStatusType::Canceled, Some(medic_id)) = (order.status, order.medic_id) {
            let medic_report = self.notify(Audience::Medic(medic_id), &cancellation_for_medic(order)).await;
            report.attempted += medic_report.attempted;
            report.delivered += medic_report.delivered;
            report.transient_failures += medic_report.transient_failures;
            report.removed_subscriptions += medic_report.removed_subscriptions;
        }
        report
    }

    /// Hooks that route dispatch events through this router.
    pub fn hooks(&self) -> EventHooks {
        let mut hooks = EventHooks::default();
        let router = self.clone();
        hooks.on_order_placed(move |ev: OrderPlacedEvent| {
            let router = router.clone();
            Box::pin(async move {
                router.announce_new_order(&ev.order).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let router = self.clone();
        hooks.on_order_status_changed(move |ev: OrderStatusChangedEvent| {
            let router = router.clone();
            Box::pin(async move {
                router.announce_status_change(&ev).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        hooks
    }
}
