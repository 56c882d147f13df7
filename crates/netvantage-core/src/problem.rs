//! RFC 7807 `application/problem+json` error envelope, used by every
//! module's HTTP surface so a client sees one consistent error shape
//! regardless of which plugin produced it.

use serde::{Deserialize, Serialize};

/// A problem+json error body.
///
/// `type` is a stable machine-readable identifier (not necessarily a
/// dereferenceable URI here — modules use short strings like
/// `"vault/sealed"`), `status` mirrors the HTTP status code, `detail` is
/// free text safe to show an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Stable machine-readable error identifier.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short human-readable summary of the problem type.
    pub title: String,
    /// HTTP status code, duplicated into the body per RFC 7807.
    pub status: u16,
    /// Detail specific to this occurrence of the problem.
    pub detail: String,
}

impl Problem {
    /// Construct a problem body.
    #[must_use]
    pub fn new(kind: impl Into<String>, title: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            status,
            detail: detail.into(),
        }
    }

    /// `400 Bad Request`-shaped problem.
    #[must_use]
    pub fn bad_request(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, "Bad Request", 400, detail)
    }

    /// `401 Unauthorized`-shaped problem.
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new("unauthorized", "Unauthorized", 401, detail)
    }

    /// `403 Forbidden`-shaped problem.
    #[must_use]
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new("forbidden", "Forbidden", 403, detail)
    }

    /// `404 Not Found`-shaped problem.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, "Not Found", 404, detail)
    }

    /// `409 Conflict`-shaped problem.
    #[must_use]
    pub fn conflict(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, "Conflict", 409, detail)
    }

    /// `410 Gone`-shaped problem.
    #[must_use]
    pub fn gone(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, "Gone", 410, detail)
    }

    /// `500 Internal Server Error`-shaped problem.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new("internal_error", "Internal Server Error", 500, detail)
    }

    /// `503 Service Unavailable`-shaped problem.
    #[must_use]
    pub fn unavailable(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, "Service Unavailable", 503, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_matches_constructor() {
        assert_eq!(Problem::not_found("vault/no_such_credential", "gone").status, 404);
        assert_eq!(Problem::unauthorized("bad token").status, 401);
    }
}
