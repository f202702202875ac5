use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use mdp_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
/// Opaque, unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a new random 128-bit order token, hex encoded.
    pub fn random() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order id cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been placed and is waiting for a medic to accept it.
    Created,
    /// A medic has claimed the order but has not yet confirmed it.
    Assigned,
    /// The medic confirmed the order.
    Accepted,
    /// The medic is travelling to the client.
    OnTheWay,
    /// The medic is at the client's address.
    Arrived,
    /// The service is in progress.
    ServiceStarted,
    /// The service is complete. Terminal.
    Done,
    /// The order was cancelled by the client or an operator. Terminal.
    Canceled,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 8] = [
        Self::Created,
        Self::Assigned,
        Self::Accepted,
        Self::OnTheWay,
        Self::Arrived,
        Self::ServiceStarted,
        Self::Done,
        Self::Canceled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Assigned => "ASSIGNED",
            Self::Accepted => "ACCEPTED",
            Self::OnTheWay => "ON_THE_WAY",
            Self::Arrived => "ARRIVED",
            Self::ServiceStarted => "SERVICE_STARTED",
            Self::Done => "DONE",
            Self::Canceled => "CANCELED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ConversionError(format!("Invalid order status: {s}")))
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub client_id: i64,
    pub medic_id: Option<i64>,
    pub service_id: i64,
    /// Snapshot of the catalog title at the time the order was placed
    pub service_title: String,
    /// Snapshot of the catalog price at the time the order was placed
    pub price: Money,
    pub discount: Money,
    pub platform_fee: Money,
    pub status: OrderStatusType,
    pub client_rating: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn net_price(&self) -> Money {
        self.price - self.discount
    }

    /// What the medic is credited when the order completes.
    pub fn medic_earnings(&self) -> Money {
        self.net_price() - self.platform_fee
    }
}

//--------------------------------------     OrderLocation      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Free text: house, floor, apartment
    pub address_details: String,
    pub contact_phone: String,
}

impl OrderLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

//--------------------------------------   OrderWithLocation    --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithLocation {
    #[serde(flatten)]
    pub order: Order,
    /// Orders placed through the dispatch API always carry a location. Rows imported from elsewhere may not.
    pub location: Option<OrderLocation>,
}

//--------------------------------------       NewOrder         --------------------------------------------------------
/// A fully validated and priced order, ready to be written to the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub client_id: i64,
    pub service: ServiceSnapshot,
    pub discount: Money,
    pub platform_fee: Money,
    pub location: OrderLocation,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    ServiceSnapshot     --------------------------------------------------------
/// The subset of a catalog entry that is copied into an order when it is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ServiceSnapshot {
    pub id: i64,
    pub title: String,
    pub price: Money,
}

//--------------------------------------       GeoPoint         --------------------------------------------------------
/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() &&
            self.longitude.is_finite() &&
            (-90.0..=90.0).contains(&self.latitude) &&
            (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

//--------------------------------------  VerificationStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

//--------------------------------------         Medic          --------------------------------------------------------
/// A service provider as seen by the dispatch engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Medic {
    pub id: i64,
    pub is_online: bool,
    pub verification_status: VerificationStatus,
    pub is_blocked: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub balance: Money,
    /// When the medic's position was last reported
    pub location_updated_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Medic {
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    /// Approved and not blocked. Only dispatchable medics may accept orders.
    pub fn is_dispatchable(&self) -> bool {
        self.verification_status == VerificationStatus::Approved && !self.is_blocked
    }
}

/// A short public view of a medic that is joined onto order responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicSummary {
    pub id: i64,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub location: Option<GeoPoint>,
}

impl From<&Medic> for MedicSummary {
    fn from(medic: &Medic) -> Self {
        Self { id: medic.id, rating: medic.rating, review_count: medic.review_count, location: medic.location() }
    }
}

//--------------------------------------         Role           --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Medic,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Medic => write!(f, "medic"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "medic" => Ok(Self::Medic),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------   Notification types   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriberType {
    Client,
    Medic,
}

impl Display for SubscriberType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Medic => write!(f, "medic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Browser push (endpoint URL)
    WebPush,
    /// Chat-bot message (chat id)
    Telegram,
    /// Mobile push (device token)
    MobilePush,
}

impl Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebPush => write!(f, "web_push"),
            Self::Telegram => write!(f, "telegram"),
            Self::MobilePush => write!(f, "mobile_push"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscriber {
    pub kind: SubscriberType,
    pub id: i64,
}

impl Subscriber {
    pub fn client(id: i64) -> Self {
        Self { kind: SubscriberType::Client, id }
    }

    pub fn medic(id: i64) -> Self {
        Self { kind: SubscriberType::Medic, id }
    }
}

impl Display for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NotificationSubscription {
    pub id: i64,
    pub subscriber_type: SubscriberType,
    pub subscriber_id: i64,
    pub channel: ChannelKind,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub subscriber: Subscriber,
    pub channel: ChannelKind,
    pub endpoint: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in OrderStatusType::ALL {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("PAID".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn status_serde_names() {
        let json = serde_json::to_string(&OrderStatusType::ServiceStarted).unwrap();
        assert_eq!(json, "\"SERVICE_STARTED\"");
    }

    #[test]
    fn terminal_statuses() {
        let terminal = OrderStatusType::ALL.iter().filter(|s| s.is_terminal()).collect::<Vec<_>>();
        assert_eq!(terminal, vec![&OrderStatusType::Done, &OrderStatusType::Canceled]);
    }

    #[test]
    fn random_order_ids_are_distinct() {
        assert_ne!(OrderId::random(), OrderId::random());
        assert_eq!(OrderId::random().as_str().len(), 32);
    }

    #[test]
    fn geo_point_validation() {
        assert!(GeoPoint::new(41.31, 69.28).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}
