//! Medic Dispatch Engine
//!
//! The dispatch engine coordinates the lifecycle of an on-demand home-medic order: matching a client's request to a
//! nearby medic, enforcing the order status state machine while the medic travels to and performs the service, and
//! propagating every status change to the people who care about it.
//!
//! The library is divided into the following sections:
//! 1. Database management ([`mod@db`]). SQLite is the supported backend. You should never need to access the
//!    database directly; use the public API instead. The data types used in the database are defined in
//!    [`mod@db_types`] and are public.
//! 2. Pure decision logic: the [`mod@state_machine`], the [`mod@geo`] matcher and the [`mod@settlement`] maths.
//! 3. The public API ([`DispatchApi`], [`OrderQueryApi`] and [`NotificationApi`]). Every status change goes through a
//!    conditional (compare-and-set) write, so concurrent callers can never both win the same transition.
//! 4. Side effects. Every committed transition is pushed to websocket subscribers via the [`mod@realtime`] bus and
//!    published as an event. The [`mod@notifications`] router subscribes to those events and fans them out to the
//!    push and chat-bot channels. Side effects never fail the operation that triggered them.
mod db;

pub mod db_types;
mod dpe_api;
pub mod events;
pub mod geo;
pub mod notifications;
pub mod realtime;
pub mod settlement;
pub mod state_machine;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::{
    errors::StoreError,
    traits::{
        CatalogService,
        DispatchDatabase,
        OrderStore,
        ProviderDirectory,
        RatingOutcome,
        SubscriptionStore,
        TransitionFields,
        TransitionRequest,
    },
};
pub use dpe_api::{
    dispatch_api::DispatchApi,
    errors::DispatchError,
    notification_api::NotificationApi,
    order_objects,
    order_query_api::OrderQueryApi,
};
