//! Session and status data shapes.

use std::sync::atomic::{AtomicU64, Ordering};

use netvantage_core::Timestamp;
use serde::{Deserialize, Serialize};

/// What kind of traffic a [`Session`] is carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Reverse-proxied HTTP traffic.
    HttpProxy,
    /// A WebSocket-to-SSH PTY bridge.
    Ssh,
}

/// The host:port a session's traffic is ultimately bound for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Resolved upstream host.
    pub host: String,
    /// Resolved upstream port.
    pub port: u16,
}

/// One live (or recently expired) gateway session.
///
/// Byte counters are atomics so proxy and SSH copy loops can update them
/// without taking a lock shared with `SessionManager`'s map.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    /// Stable session id, also the `/proxy/s/{id}` path segment.
    pub id: String,
    /// Device this session was opened against, if resolved through
    /// [`netvantage_core::DeviceLookup`].
    pub device_id: Option<String>,
    /// Identity of the caller that opened this session.
    pub user_id: String,
    /// What kind of traffic this session carries.
    pub kind: SessionKind,
    /// Resolved upstream target.
    pub target: Target,
    /// Caller's source IP, recorded for audit.
    pub source_ip: Option<String>,
    /// When this session was created.
    pub created_at: Timestamp,
    /// When this session expires and becomes eligible for reaping.
    pub expires_at: Timestamp,
    /// Bytes copied from the upstream side to the client.
    #[serde(serialize_with = "serialize_atomic", deserialize_with = "deserialize_atomic")]
    pub bytes_in: AtomicU64,
    /// Bytes copied from the client to the upstream side.
    #[serde(serialize_with = "serialize_atomic", deserialize_with = "deserialize_atomic")]
    pub bytes_out: AtomicU64,
}

fn serialize_atomic<S: serde::Serializer>(value: &AtomicU64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.load(Ordering::Relaxed))
}

fn deserialize_atomic<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<AtomicU64, D::Error> {
    Ok(AtomicU64::new(u64::deserialize(deserializer)?))
}

impl Session {
    /// Whether `now` is past this session's expiry.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }

    /// A read-only snapshot suitable for JSON responses.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            device_id: self.device_id.clone(),
            user_id: self.user_id.clone(),
            kind: self.kind,
            target: Target { host: self.target.host.clone(), port: self.target.port },
            source_ip: self.source_ip.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
        }
    }
}

/// JSON-friendly [`Session`] view with byte counters as plain integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Stable session id.
    pub id: String,
    /// Associated device, if any.
    pub device_id: Option<String>,
    /// Identity of the caller that opened this session.
    pub user_id: String,
    /// Session kind.
    pub kind: SessionKind,
    /// Resolved upstream target.
    pub target: Target,
    /// Caller's source IP.
    pub source_ip: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Expiry time.
    pub expires_at: Timestamp,
    /// Bytes copied from upstream to client so far.
    pub bytes_in: u64,
    /// Bytes copied from client to upstream so far.
    pub bytes_out: u64,
}

/// Gateway-wide status, for `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    /// Number of currently open sessions.
    pub active_sessions: usize,
    /// Configured maximum concurrent sessions.
    pub max_sessions: usize,
}
