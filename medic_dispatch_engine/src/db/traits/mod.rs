//! # Storage contracts
//!
//! These traits define what a storage backend has to provide for the dispatch engine to work on top of it.
//!
//! * [`OrderStore`] is the authoritative record of orders and their locations. Every status change goes through
//!   [`OrderStore::conditional_transition`], which only applies if the order is still in the status the caller last
//!   saw.
//! * [`ProviderDirectory`] exposes medics: presence, verification, location and the notification endpoints of the
//!   medics who are currently online.
//! * [`CatalogService`] is the sole pricing gate. Orders are always priced from an active catalog entry.
//! * [`SubscriptionStore`] keeps the notification endpoints that clients and medics opted in to.
//!
//! [`DispatchDatabase`] bundles all four and is what the public API is generic over.
mod catalog;
mod order_store;
mod provider_directory;
mod subscription_store;

pub use catalog::CatalogService;
pub use order_store::{OrderStore, RatingOutcome, TransitionFields, TransitionRequest};
pub use provider_directory::ProviderDirectory;
pub use subscription_store::SubscriptionStore;

pub trait DispatchDatabase:
    OrderStore + ProviderDirectory + CatalogService + SubscriptionStore + Clone + Send + Sync + 'static
{
}

impl<T> DispatchDatabase for T where T: OrderStore + ProviderDirectory + CatalogService + SubscriptionStore + Clone + Send + Sync + 'static
{}
