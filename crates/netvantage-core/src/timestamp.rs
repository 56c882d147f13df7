//! Wall-clock timestamp used across fabric and module data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A UTC point in time.
///
/// Thin wrapper so every crate shares one serialization format instead of
/// passing `chrono::DateTime<Utc>` around directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing `chrono` timestamp.
    #[must_use]
    pub const fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Whether this timestamp is strictly before `now`.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_not_past_immediately() {
        let t = Timestamp::now();
        assert!(!t.is_past());
    }

    #[test]
    fn ordering_follows_wall_clock() {
        let a = Timestamp::now();
        let b = Timestamp(a.0 + chrono::Duration::seconds(1));
        assert!(a < b);
    }
}
