use thiserror::Error;

use crate::db_types::{OrderId, OrderStatusType};

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Medic #{0} does not exist")]
    ProviderNotFound(i64),
    #[error("Service #{0} does not exist or is not active")]
    ServiceNotFound(i64),
    #[error("Subscription #{0} does not exist")]
    SubscriptionNotFound(i64),
    #[error("Order {order_id} is no longer {expected}. It is currently {actual}")]
    Conflict { order_id: OrderId, expected: OrderStatusType, actual: OrderStatusType },
    #[error("Order {0} has already been rated")]
    AlreadyRated(OrderId),
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::QueryError(format!("Migration failed: {e}"))
    }
}
