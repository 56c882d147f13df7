//! Subscriber registry: tracks who is listening to which topics, in the
//! order they registered, and hands back idempotent unsubscribe handles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use netvantage_core::EventSubscriber;
use parking_lot::RwLock;

/// Opaque identifier for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

fn next_subscriber_id() -> SubscriberId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    SubscriberId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// What a subscription matches.
#[derive(Debug, Clone)]
enum Target {
    /// An exact topic string.
    Topic(String),
    /// Every topic (`subscribe_all`).
    All,
}

struct Subscription {
    id: SubscriberId,
    target: Target,
    handler: Arc<dyn EventSubscriber>,
    /// Serializes invocations of this one subscriber across concurrent
    /// `publish_async` dispatches, so it never sees two events at once.
    invoke_lock: Arc<tokio::sync::Mutex<()>>,
}

/// The ordered set of live subscriptions, shared between the bus and every
/// [`UnsubscribeHandle`] it hands out.
#[derive(Default)]
pub(crate) struct Registry {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self { subscriptions: RwLock::new(Vec::new()) }
    }

    fn insert(self: &Arc<Self>, target: Target, handler: Arc<dyn EventSubscriber>) -> UnsubscribeHandle {
        let id = next_subscriber_id();
        let sub = Subscription { id, target, handler, invoke_lock: Arc::new(tokio::sync::Mutex::new(())) };
        self.subscriptions.write().push(sub);
        UnsubscribeHandle { id, registry: Arc::clone(self) }
    }

    pub(crate) fn subscribe(self: &Arc<Self>, topic: impl Into<String>, handler: Arc<dyn EventSubscriber>) -> UnsubscribeHandle {
        self.insert(Target::Topic(topic.into()), handler)
    }

    pub(crate) fn subscribe_all(self: &Arc<Self>, handler: Arc<dyn EventSubscriber>) -> UnsubscribeHandle {
        self.insert(Target::All, handler)
    }

    fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Snapshot the handlers matching `topic`, in registration order, along
    /// with each one's serial invocation lock.
    pub(crate) fn matching(&self, topic: &str) -> Vec<(Arc<dyn EventSubscriber>, Arc<tokio::sync::Mutex<()>>)> {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| match &s.target {
                Target::Topic(t) => t == topic,
                Target::All => true,
            })
            .map(|s| (Arc::clone(&s.handler), Arc::clone(&s.invoke_lock)))
            .collect()
    }
}

/// A handle returned by `subscribe`/`subscribe_all`. Dropping it does
/// nothing — call [`UnsubscribeHandle::unsubscribe`] explicitly to stop
/// receiving events. Calling it more than once is a no-op after the first.
pub struct UnsubscribeHandle {
    id: SubscriberId,
    registry: Arc<Registry>,
}

impl UnsubscribeHandle {
    /// Remove this subscription. Idempotent: a second call returns `false`.
    /// Takes effect no later than the next `publish`/`publish_async` call —
    /// in-flight deliveries already holding a snapshot of the subscriber
    /// list are unaffected.
    pub fn unsubscribe(&self) -> bool {
        self.registry.unsubscribe(self.id)
    }
}
