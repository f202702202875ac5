//! Realtime publish/subscribe for websocket clients.
//!
//! Every connection authenticates once, when it is opened. Connections can then join per-order topics to follow an
//! order's status and the medic's location. Medic connections are also placed on the shared providers feed, where new
//! orders are announced. Topic membership lives only as long as the connection does.
mod bus;
mod errors;
mod messages;

pub use bus::{ConnectionAuthenticator, ConnectionHandle, Identity, RealtimeBus, RealtimeConnection};
pub use errors::RealtimeError;
pub use messages::{LocationSource, NewOrderSummary, RealtimeEvent, Topic};
