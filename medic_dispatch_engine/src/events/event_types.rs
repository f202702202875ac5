use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderStatusType, OrderWithLocation},
    state_machine::TransitionActor,
};

/// A new order has been committed in `CREATED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: OrderWithLocation,
}

impl OrderPlacedEvent {
    pub fn new(order: OrderWithLocation) -> Self {
        Self { order }
    }
}

/// An order's status change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub previous: OrderStatusType,
    pub actor: TransitionActor,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, previous: OrderStatusType, actor: TransitionActor) -> Self {
        Self { order, previous, actor }
    }

    pub fn status(&self) -> OrderStatusType {
        self.order.status
    }
}
