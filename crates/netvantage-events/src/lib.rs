//! NetVantage Events - the in-process pub/sub bus shared by every plugin.
//!
//! Topics use dotted `<module>.<noun>.<verb>` namespaces. [`EventBus::publish`]
//! delivers to every matching subscriber in registration order and only
//! returns once delivery completes; [`EventBus::publish_async`] hands
//! delivery to background tasks and returns immediately, still guaranteeing
//! a single subscriber is never invoked concurrently with itself.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod bus;
mod event;
mod subscription;

pub use bus::EventBus;
pub use event::Event;
pub use subscription::{SubscriberId, UnsubscribeHandle};
