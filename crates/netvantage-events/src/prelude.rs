//! Commonly used types for convenient import.

pub use crate::{Event, EventBus, SubscriberId, UnsubscribeHandle};
pub use netvantage_core::EventSubscriber;
