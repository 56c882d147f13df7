//! The concurrent session map: `create`/`get`/`delete`/`list`/`count` plus
//! expiry reaping, used by both the reverse-proxy and SSH-bridge handlers.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use netvantage_core::Timestamp;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::model::{Session, SessionKind, Target};

/// Bounded map of live [`Session`]s.
///
/// `create` and the map's length are observed under the same write-lock
/// critical section, so `count() <= max_sessions` holds across any
/// interleaving of concurrent `create`/`delete` calls. Byte counters inside
/// a `Session` are separate atomics updated by proxy/SSH copy loops without
/// touching this lock at all.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
}

impl SessionManager {
    /// Build an empty manager bounded at `max_sessions` concurrent sessions.
    #[must_use]
    pub fn new(max_sessions: usize) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), max_sessions }
    }

    /// Open a new session, rejecting with [`GatewayError::AtCapacity`] if
    /// the manager is already at `max_sessions`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        device_id: Option<String>,
        user_id: String,
        kind: SessionKind,
        target: Target,
        source_ip: Option<String>,
        ttl: chrono::Duration,
    ) -> GatewayResult<Arc<Session>> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            return Err(GatewayError::AtCapacity);
        }
        let now = Timestamp::now();
        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            device_id,
            user_id,
            kind,
            target,
            source_ip,
            created_at: now,
            expires_at: Timestamp::from_datetime(now.0 + ttl),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
        });
        sessions.insert(session.id.clone(), Arc::clone(&session));
        Ok(session)
    }

    /// Fetch a live session by id, if it exists and has not expired.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session by id. Idempotent — returns the removed session, if
    /// one existed.
    pub fn delete(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.write().remove(id)
    }

    /// Snapshot every currently tracked session.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Number of currently tracked sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// The configured concurrent-session bound.
    #[must_use]
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Remove and return every session whose `expires_at` is before `now`.
    pub fn close_expired(&self, now: Timestamp) -> Vec<Arc<Session>> {
        let mut sessions = self.sessions.write();
        let expired: Vec<String> = sessions.iter().filter(|(_, s)| s.is_expired(now)).map(|(id, _)| id.clone()).collect();
        expired.into_iter().filter_map(|id| sessions.remove(&id)).collect()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").field("count", &self.count()).field("max_sessions", &self.max_sessions).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target { host: "10.0.0.1".into(), port: 22 }
    }

    #[test]
    fn create_rejects_past_capacity() {
        let manager = SessionManager::new(2);
        manager.create(None, "u1".into(), SessionKind::Ssh, target(), None, chrono::Duration::minutes(5)).unwrap();
        manager.create(None, "u1".into(), SessionKind::Ssh, target(), None, chrono::Duration::minutes(5)).unwrap();
        let err = manager.create(None, "u1".into(), SessionKind::Ssh, target(), None, chrono::Duration::minutes(5)).unwrap_err();
        assert!(matches!(err, GatewayError::AtCapacity));
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn delete_is_idempotent() {
        let manager = SessionManager::new(4);
        let session = manager.create(None, "u1".into(), SessionKind::HttpProxy, target(), None, chrono::Duration::minutes(5)).unwrap();
        assert!(manager.delete(&session.id).is_some());
        assert!(manager.delete(&session.id).is_none());
    }

    #[test]
    fn close_expired_removes_only_past_sessions() {
        let manager = SessionManager::new(4);
        let fresh = manager.create(None, "u1".into(), SessionKind::HttpProxy, target(), None, chrono::Duration::minutes(5)).unwrap();
        let stale = manager.create(None, "u1".into(), SessionKind::HttpProxy, target(), None, chrono::Duration::minutes(-1)).unwrap();

        let expired = manager.close_expired(Timestamp::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, stale.id);
        assert!(manager.get(&fresh.id).is_some());
        assert!(manager.get(&stale.id).is_none());
    }

    #[test]
    fn count_never_exceeds_max_under_repeated_create_delete() {
        let manager = SessionManager::new(1);
        for _ in 0..5 {
            let session = manager.create(None, "u1".into(), SessionKind::HttpProxy, target(), None, chrono::Duration::minutes(5)).unwrap();
            assert_eq!(manager.count(), 1);
            manager.delete(&session.id);
        }
    }
}
