use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{MedicSummary, OrderId, OrderStatusType, OrderWithLocation},
    realtime::LocationSource,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub client_id: Option<i64>,
    pub medic_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_client_id(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_medic_id(mut self, medic_id: i64) -> Self {
        self.medic_id = Some(medic_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.client_id.is_none() &&
            self.medic_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.as_ref().map_or(true, |s| s.is_empty())
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(order_id) = &self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(client_id) = &self.client_id {
            write!(f, "client_id: {client_id}. ")?;
        }
        if let Some(medic_id) = &self.medic_id {
            write!(f, "medic_id: {medic_id}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}

/// Offset pagination. `count` is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: i64,
    pub count: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, count: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(offset: Option<i64>, count: Option<i64>) -> Self {
        let offset = offset.unwrap_or(0).max(0);
        let count = count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self { offset, count }
    }

    /// Everything. Used internally for candidate lists that are filtered in memory afterwards.
    pub fn unbounded() -> Self {
        Self { offset: 0, count: -1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub offset: i64,
    pub count: i64,
    pub orders: Vec<OrderWithLocation>,
}

impl OrderPage {
    pub fn new(pagination: Pagination, orders: Vec<OrderWithLocation>) -> Self {
        Self { offset: pagination.offset, count: orders.len() as i64, orders }
    }
}

/// A medic near an order, as returned to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyMedic {
    #[serde(flatten)]
    pub medic: MedicSummary,
    pub distance_km: f64,
}

/// Where the medic serving an order was last seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPosition {
    pub order_id: OrderId,
    pub medic_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub source: LocationSource,
    pub updated_at: DateTime<Utc>,
}
