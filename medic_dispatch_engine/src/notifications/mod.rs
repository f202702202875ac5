//! Multi-channel notification fan-out.
//!
//! The [`NotificationRouter`] turns dispatch events into human-readable [`Notification`]s, resolves who should receive
//! them, and pushes them to every registered endpoint on every configured channel at once. Each send is independent
//! and bounded by a timeout. Failures are logged, never returned; an endpoint that the channel reports as permanently
//! gone has its subscription deleted.
pub mod channels;
mod messages;
mod router;

pub use channels::{ChannelError, DeliveryOutcome, NotificationChannel};
pub use messages::{cancellation_for_medic, new_order_message, status_message, Notification};
pub use router::{Audience, FanOutReport, NotificationRouter};
