use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mdp_common::Money;
use medic_dispatch_engine::{
    db_types::{ChannelKind, GeoPoint, OrderId, OrderLocation, OrderStatusType},
    order_objects::{OrderQueryFilter, Pagination},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub service_id: i64,
    #[serde(default)]
    pub discount: Money,
    pub location: OrderLocation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateOrderRequest {
    pub stars: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OnlineRequest {
    pub online: bool,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockRequest {
    #[serde(default = "default_true")]
    pub blocked: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub channel: ChannelKind,
    pub endpoint: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageParams {
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl From<PageParams> for Pagination {
    fn from(value: PageParams) -> Self {
        Pagination::new(value.offset, value.count)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearbyParams {
    pub limit: Option<usize>,
}

/// Query string for the admin order search. `status` is a comma-separated list, e.g. `status=CREATED,ASSIGNED`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminOrderQuery {
    pub order_id: Option<String>,
    pub client_id: Option<i64>,
    pub medic_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl AdminOrderQuery {
    pub fn into_parts(self) -> Result<(OrderQueryFilter, Pagination), ServerError> {
        let mut filter = OrderQueryFilter {
            order_id: self.order_id.map(OrderId::from),
            client_id: self.client_id,
            medic_id: self.medic_id,
            since: self.since,
            until: self.until,
            status: None,
        };
        if let Some(statuses) = self.status {
            for s in statuses.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let status = OrderStatusType::from_str(s).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
                filter = filter.with_status(status);
            }
        }
        Ok((filter, Pagination::new(self.offset, self.count)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

/// Frames a websocket client sends to manage its order topics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SocketCommand {
    Subscribe { order_id: OrderId },
    Unsubscribe { order_id: OrderId },
}
