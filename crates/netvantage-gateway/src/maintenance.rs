//! The gateway's background maintenance loop: reap expired sessions, drop
//! their proxy targets, and prune the audit trail on a fixed interval.

use std::sync::Arc;

use netvantage_core::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::state::GatewayState;

/// Run the maintenance sweep on `state.config.maintenance_interval`, until
/// `shutdown` is cancelled.
///
/// Per module `Stop`, this loop must return promptly once cancelled — it
/// never outlives more than one outstanding sweep.
pub async fn run(state: Arc<GatewayState>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(state.config.maintenance_interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("gateway maintenance loop stopping");
                return;
            }
            _ = ticker.tick() => {
                sweep(&state).await;
            }
        }
    }
}

async fn sweep(state: &GatewayState) {
    let expired = state.sessions.close_expired(Timestamp::now());
    for session in &expired {
        state.proxies.remove(&session.id);
        state
            .audit
            .append_best_effort(session.id.clone(), Some(session.user_id.clone()), "closed:expired", None, None)
            .await;
        state.event_bus.publish_async("gateway.session.closed", "gateway", serde_json::json!({ "session_id": session.id }));
    }
    if !expired.is_empty() {
        tracing::info!(count = expired.len(), "expired sessions reaped");
    }

    match state.audit.prune_retention(state.config.audit_retention_days).await {
        Ok(pruned) if pruned > 0 => tracing::info!(pruned, "audit rows pruned past retention"),
        Ok(_) => {},
        Err(e) => tracing::warn!(error = %e, "audit retention prune failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use netvantage_audit::{AuditLog, KvAuditStorage};
    use netvantage_core::Timestamp;
    use netvantage_crypto::KeyPair;
    use netvantage_events::EventBus;
    use netvantage_storage::MemoryKvStore;

    use super::*;
    use crate::model::{SessionKind, Target};
    use crate::state::GatewayConfig;

    struct NoCapabilities;

    impl netvantage_core::PluginResolver for NoCapabilities {
        fn resolve_by_role(&self, _role: &str) -> Option<Arc<dyn std::any::Any + Send + Sync>> {
            None
        }
    }

    fn state() -> Arc<GatewayState> {
        let bus = Arc::new(EventBus::new());
        let audit = Arc::new(AuditLog::new(Arc::new(KvAuditStorage::new(Arc::new(MemoryKvStore::new()))), Arc::new(KeyPair::generate())));
        let resolver = Arc::new(NoCapabilities);
        Arc::new(GatewayState::new(bus, resolver, audit, GatewayConfig::default()))
    }

    #[tokio::test]
    async fn sweep_removes_expired_sessions_and_proxies() {
        let state = state();
        let session = state
            .sessions
            .create(None, "u1".into(), SessionKind::HttpProxy, Target { host: "10.0.0.1".into(), port: 80 }, None, chrono::Duration::minutes(-1))
            .unwrap();
        state.proxies.create(&session, "http");

        sweep(&state).await;

        assert_eq!(state.sessions.count(), 0);
        let entries = state.audit.entries_for_subject(&session.id).await.unwrap();
        assert!(entries.iter().any(|e| e.action == "closed:expired"));
    }

    #[tokio::test]
    async fn sweep_leaves_live_sessions_alone() {
        let state = state();
        state
            .sessions
            .create(None, "u1".into(), SessionKind::HttpProxy, Target { host: "10.0.0.1".into(), port: 80 }, None, chrono::Duration::minutes(5))
            .unwrap();

        sweep(&state).await;

        assert_eq!(state.sessions.count(), 1);
        let _ = Timestamp::now();
    }
}
