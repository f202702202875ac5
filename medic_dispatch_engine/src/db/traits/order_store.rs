use async_trait::async_trait;
use mdp_common::Money;

use crate::{
    db::errors::StoreError,
    db_types::{Medic, NewOrder, Order, OrderId, OrderStatusType, OrderWithLocation},
    order_objects::{OrderQueryFilter, Pagination},
};

/// Extra columns written by a status transition, in the same atomic write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionFields {
    /// Binds the medic to the order. Only ever set when leaving `CREATED`.
    pub medic_id: Option<i64>,
    /// Credits `(medic_id, amount)` to a medic's balance. If the credit cannot be applied, the transition is rolled
    /// back.
    pub credit: Option<(i64, Money)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub order_id: OrderId,
    pub expected: OrderStatusType,
    pub new_status: OrderStatusType,
    pub fields: TransitionFields,
}

impl TransitionRequest {
    pub fn new(order_id: OrderId, expected: OrderStatusType, new_status: OrderStatusType) -> Self {
        Self { order_id, expected, new_status, fields: TransitionFields::default() }
    }

    pub fn with_medic(mut self, medic_id: i64) -> Self {
        self.fields.medic_id = Some(medic_id);
        self
    }

    pub fn with_credit(mut self, medic_id: i64, amount: Money) -> Self {
        self.fields.credit = Some((medic_id, amount));
        self
    }
}

/// The result of recording a client's review.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingOutcome {
    pub order: Order,
    pub medic: Medic,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the order and its location together. Either both records exist afterwards or neither does.
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithLocation, StoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<OrderWithLocation>, StoreError>;

    /// Moves the order to `new_status` if, and only if, it is still in `expected`.
    ///
    /// Returns [`StoreError::Conflict`] and leaves the order untouched when the status has moved on, and
    /// [`StoreError::OrderNotFound`] when there is no such order.
    async fn conditional_transition(&self, request: TransitionRequest) -> Result<Order, StoreError>;

    /// Atomically adds a non-negative `amount` to the medic's balance and returns the new balance.
    async fn credit_balance(&self, medic_id: i64, amount: Money) -> Result<Money, StoreError>;

    /// Stores the client's rating on a `DONE` order and folds it into the medic's running average, in one write.
    ///
    /// Fails with [`StoreError::AlreadyRated`] if the order already carries a rating.
    async fn record_rating(&self, order_id: &OrderId, stars: u8) -> Result<RatingOutcome, StoreError>;

    /// Orders matching the filter, oldest first.
    async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<OrderWithLocation>, StoreError>;
}
