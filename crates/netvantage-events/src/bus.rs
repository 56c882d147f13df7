//! The shared event bus: synchronous in-order publish plus a fire-and-forget
//! async path, both fed by the same subscriber registry.

use std::sync::Arc;

use async_trait::async_trait;
use netvantage_core::EventPublisher;

use crate::event::Event;
use crate::subscription::{Registry, UnsubscribeHandle};

/// In-process pub/sub bus shared by every registered plugin.
///
/// Cloning an `EventBus` is cheap — it shares the same subscriber registry,
/// so any clone sees subscriptions made through any other.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Construct an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self { registry: Arc::new(Registry::new()) }
    }

    /// Subscribe to an exact topic.
    pub fn subscribe(&self, topic: impl Into<String>, handler: Arc<dyn netvantage_core::EventSubscriber>) -> UnsubscribeHandle {
        self.registry.subscribe(topic, handler)
    }

    /// Subscribe to every topic.
    pub fn subscribe_all(&self, handler: Arc<dyn netvantage_core::EventSubscriber>) -> UnsubscribeHandle {
        self.registry.subscribe_all(handler)
    }

    /// Deliver `event` to every matching subscriber, in registration order,
    /// awaiting each handler before moving to the next. Handler errors
    /// (panics aside) have nowhere to propagate to — this bus has no
    /// fallible handler contract, so a misbehaving subscriber can only
    /// slow delivery down, never fail it.
    pub async fn publish(&self, event: Event) {
        let matching = self.registry.matching(&event.topic);
        tracing::trace!(topic = %event.topic, subscribers = matching.len(), "publishing event");
        for (handler, lock) in matching {
            let _guard = lock.lock().await;
            handler.on_event(&event.topic, &event.source, &event.payload).await;
        }
    }

    /// Hand `event` off to a background task and return immediately.
    /// Ordering relative to other `publish_async` calls is not guaranteed;
    /// each subscriber's own invocations are still serialized via its
    /// per-subscriber lock.
    pub fn publish_async(&self, event: Event) {
        let matching = self.registry.matching(&event.topic);
        tracing::trace!(topic = %event.topic, subscribers = matching.len(), "dispatching event async");
        for (handler, lock) in matching {
            let topic = event.topic.clone();
            let source = event.source.clone();
            let payload = event.payload.clone();
            tokio::spawn(async move {
                let _guard = lock.lock().await;
                handler.on_event(&topic, &source, &payload).await;
            });
        }
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, topic: &str, source: &str, payload: serde_json::Value) {
        Self::publish(self, Event::new(topic, source, payload)).await;
    }

    fn publish_async(&self, topic: &str, source: &str, payload: serde_json::Value) {
        Self::publish_async(self, Event::new(topic, source, payload));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use netvantage_core::EventSubscriber;
    use tokio::sync::Mutex;

    use super::*;

    struct RecordingSubscriber {
        order: Arc<Mutex<Vec<String>>>,
        label: String,
    }

    #[async_trait]
    impl EventSubscriber for RecordingSubscriber {
        async fn on_event(&self, topic: &str, _source: &str, _payload: &serde_json::Value) {
            self.order.lock().await.push(format!("{}:{}", self.label, topic));
        }
    }

    #[tokio::test]
    async fn publish_delivers_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "vault.credential.created",
            Arc::new(RecordingSubscriber { order: Arc::clone(&order), label: "first".into() }),
        );
        bus.subscribe(
            "vault.credential.created",
            Arc::new(RecordingSubscriber { order: Arc::clone(&order), label: "second".into() }),
        );

        bus.publish(Event::new("vault.credential.created", "vault", serde_json::json!({}))).await;

        let recorded = order.lock().await;
        assert_eq!(*recorded, vec!["first:vault.credential.created", "second:vault.credential.created"]);
    }

    #[tokio::test]
    async fn subscribe_all_receives_every_topic() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_all(Arc::new(RecordingSubscriber { order: Arc::clone(&order), label: "wild".into() }));

        bus.publish(Event::new("vault.credential.created", "vault", serde_json::json!({}))).await;
        bus.publish(Event::new("gateway.session.closed", "gateway", serde_json::json!({}))).await;

        assert_eq!(order.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_stops_future_delivery() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let handle = bus.subscribe(
            "gateway.session.created",
            Arc::new(RecordingSubscriber { order: Arc::clone(&order), label: "one".into() }),
        );

        bus.publish(Event::new("gateway.session.created", "gateway", serde_json::json!({}))).await;
        assert_eq!(order.lock().await.len(), 1);

        assert!(handle.unsubscribe());
        assert!(!handle.unsubscribe(), "second unsubscribe must be a no-op");

        bus.publish(Event::new("gateway.session.created", "gateway", serde_json::json!({}))).await;
        assert_eq!(order.lock().await.len(), 1, "unsubscribed handler must not see the second publish");
    }

    #[tokio::test]
    async fn publish_async_does_not_deliver_concurrently_to_one_subscriber() {
        let bus = EventBus::new();
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        struct GuardSubscriber {
            concurrent: Arc<AtomicUsize>,
            max_concurrent: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl EventSubscriber for GuardSubscriber {
            async fn on_event(&self, _topic: &str, _source: &str, _payload: &serde_json::Value) {
                let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                self.concurrent.fetch_sub(1, Ordering::SeqCst);
            }
        }

        bus.subscribe_all(Arc::new(GuardSubscriber {
            concurrent: Arc::clone(&concurrent),
            max_concurrent: Arc::clone(&max_concurrent),
        }));

        for _ in 0..5 {
            bus.publish_async(Event::new("x.y.z", "src", serde_json::json!({})));
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }
}
