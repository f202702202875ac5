use thiserror::Error;

use crate::{db::errors::StoreError, db_types::OrderId, settlement::SettlementError, state_machine::TransitionError};

/// Everything a caller of the dispatch API can get back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("{0} was not found")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid status transition. {0}")]
    InvalidTransition(#[from] TransitionError),
    /// Someone else changed the order first. Re-read it and try again.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Order {0} is no longer available")]
    OrderNotAvailable(OrderId),
    #[error("Order {0} has already been rated")]
    AlreadyRated(OrderId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl DispatchError {
    /// True for the errors caused by losing a race for the same order.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::OrderNotAvailable(_))
    }
}

impl From<StoreError> for DispatchError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => Self::NotFound(format!("Order {id}")),
            StoreError::ProviderNotFound(id) => Self::NotFound(format!("Medic #{id}")),
            StoreError::ServiceNotFound(id) => Self::NotFound(format!("Service #{id}")),
            StoreError::SubscriptionNotFound(id) => Self::NotFound(format!("Subscription #{id}")),
            e @ StoreError::Conflict { .. } => Self::Conflict(e.to_string()),
            StoreError::AlreadyRated(id) => Self::AlreadyRated(id),
            e @ (StoreError::DriverError(_) | StoreError::QueryError(_)) => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<SettlementError> for DispatchError {
    fn from(e: SettlementError) -> Self {
        Self::Validation(e.to_string())
    }
}
