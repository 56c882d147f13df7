//! The event envelope delivered to every subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event published on the bus.
///
/// `topic` follows the dotted `<module>.<noun>.<verb>` convention (e.g.
/// `"vault.credential.created"`, `"gateway.session.closed"`); the payload
/// shape is a contract of the topic, not enforced by the bus itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Dotted topic name.
    pub topic: String,
    /// Name of the plugin that published this event.
    pub source: String,
    /// When the event was published.
    pub timestamp: DateTime<Utc>,
    /// Topic-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Construct an event stamped with the current time.
    #[must_use]
    pub fn new(topic: impl Into<String>, source: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { topic: topic.into(), source: source.into(), timestamp: Utc::now(), payload }
    }
}
