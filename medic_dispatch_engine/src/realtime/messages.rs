use std::fmt::Display;

use chrono::{DateTime, Utc};
use mdp_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, OrderStatusType, OrderWithLocation};

const ORDER_TOPIC_PREFIX: &str = "order:";
const PROVIDERS_FEED: &str = "providers-feed";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Status and location updates for one order
    Order(OrderId),
    /// New-order announcements for every connected medic
    ProvidersFeed,
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Order(id) => write!(f, "{ORDER_TOPIC_PREFIX}{}", id.as_str()),
            Topic::ProvidersFeed => write!(f, "{PROVIDERS_FEED}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationSource {
    /// Pushed by the medic's device
    Live,
    /// The last known location, re-sent because a client asked for it
    PolledFallback,
}

/// What a medic sees when a new order is announced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderSummary {
    pub order_id: OrderId,
    pub service_title: String,
    pub price: Money,
    pub discount: Money,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<&OrderWithLocation> for NewOrderSummary {
    fn from(value: &OrderWithLocation) -> Self {
        let order = &value.order;
        Self {
            order_id: order.id.clone(),
            service_title: order.service_title.clone(),
            price: order.price,
            discount: order.discount,
            latitude: value.location.as_ref().map(|l| l.latitude),
            longitude: value.location.as_ref().map(|l| l.longitude),
            created_at: order.created_at,
        }
    }
}

/// Frames pushed to realtime connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    OrderStatusChanged {
        order_id: OrderId,
        status: OrderStatusType,
        updated_at: DateTime<Utc>,
    },
    NewOrder(NewOrderSummary),
    ProviderLocation {
        order_id: OrderId,
        medic_id: i64,
        latitude: f64,
        longitude: f64,
        source: LocationSource,
        timestamp: DateTime<Utc>,
    },
}
