//! Order status state machine
//!
//! The status graph is fixed. Every legal move is listed in [`allowed_targets`], keyed by the current status and the
//! kind of actor asking for the move. Anything not in the table is denied.
//!
//! ```text
//!  CREATED ──accept──► ASSIGNED ─► ACCEPTED ─► ON_THE_WAY ─► ARRIVED ─► SERVICE_STARTED ─► DONE
//!     │                   │
//!     └──client cancel────┴──► CANCELED ◄── operator cancel (any non-terminal status)
//! ```
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::OrderStatusType::{self, *};

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionActor {
    /// The client who placed the order.
    Client,
    /// A medic claiming an unassigned order.
    AcceptingMedic,
    /// The medic already bound to the order.
    AssignedMedic,
    /// A platform operator.
    Operator,
}

impl Display for TransitionActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::AcceptingMedic => write!(f, "accepting medic"),
            Self::AssignedMedic => write!(f, "assigned medic"),
            Self::Operator => write!(f, "operator"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("The {actor} may not move an order from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatusType,
    pub to: OrderStatusType,
    pub actor: TransitionActor,
}

const NONE: &[OrderStatusType] = &[];

/// The statuses `actor` may move an order to when it is currently in `current`.
pub fn allowed_targets(current: OrderStatusType, actor: TransitionActor) -> &'static [OrderStatusType] {
    use TransitionActor::*;
    match (current, actor) {
        (Created | Assigned, Client) => &[Canceled],
        (Created, AcceptingMedic) => &[Assigned],
        (Assigned, AssignedMedic) => &[Accepted],
        (Accepted, AssignedMedic) => &[OnTheWay],
        (OnTheWay, AssignedMedic) => &[Arrived],
        (Arrived, AssignedMedic) => &[ServiceStarted],
        (ServiceStarted, AssignedMedic) => &[Done],
        (Done | Canceled, Operator) => NONE,
        (_, Operator) => &[Canceled],
        _ => NONE,
    }
}

pub fn validate_transition(
    current: OrderStatusType,
    requested: OrderStatusType,
    actor: TransitionActor,
) -> Result<(), TransitionError> {
    if allowed_targets(current, actor).contains(&requested) {
        Ok(())
    } else {
        Err(TransitionError { from: current, to: requested, actor })
    }
}

/// The single status that follows `current` in the medic's progression, if there is one.
pub fn next_medic_step(current: OrderStatusType) -> Option<OrderStatusType> {
    allowed_targets(current, TransitionActor::AssignedMedic).first().copied()
}
