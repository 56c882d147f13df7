//! Reverse-proxy handle registry: forwards method, path, query, headers and
//! body verbatim to a session's resolved upstream target, relaying the
//! response unchanged.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use parking_lot::RwLock;

use crate::model::Session;

/// One session's upstream target, enough to rebuild a full URL per request.
#[derive(Debug, Clone)]
struct ProxyHandle {
    scheme: String,
    host: String,
    port: u16,
}

/// A relayed HTTP response, carried back to the axum handler that called
/// [`ReverseProxyManager::serve`].
pub struct ProxyResponse {
    /// Upstream status code, relayed unchanged.
    pub status: StatusCode,
    /// Upstream response headers, relayed unchanged.
    pub headers: HeaderMap,
    /// Upstream response body, relayed unchanged.
    pub body: Bytes,
}

/// Maps session id to upstream proxy target and performs the actual
/// round-trip via a shared [`reqwest::Client`].
pub struct ReverseProxyManager {
    client: reqwest::Client,
    handles: RwLock<HashMap<String, ProxyHandle>>,
}

impl ReverseProxyManager {
    /// Build a manager over a fresh `reqwest` client.
    #[must_use]
    pub fn new() -> Self {
        Self { client: reqwest::Client::new(), handles: RwLock::new(HashMap::new()) }
    }

    /// Register `session`'s upstream target under `scheme` (`"http"` or
    /// `"https"`).
    pub fn create(&self, session: &Session, scheme: &str) {
        self.handles.write().insert(
            session.id.clone(),
            ProxyHandle { scheme: scheme.to_string(), host: session.target.host.clone(), port: session.target.port },
        );
    }

    /// Forward one request to `session_id`'s upstream target, with the
    /// gateway prefix already stripped from `path`.
    ///
    /// Never panics: any transport failure is reported as
    /// [`crate::error::GatewayError::Upstream`] for the caller to turn into
    /// a 502, never propagated as a panic through the handler boundary.
    pub async fn serve(
        &self,
        session_id: &str,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<ProxyResponse, crate::error::GatewayError> {
        let handle = self
            .handles
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| crate::error::GatewayError::NotFound(session_id.to_string()))?;

        let mut url = format!("{}://{}:{}{}", handle.scheme, handle.host, handle.port, path);
        if let Some(q) = query {
            if !q.is_empty() {
                url.push('?');
                url.push_str(q);
            }
        }

        let result = self.client.request(method.clone(), &url).headers(headers).body(body).send().await;

        match result {
            Ok(response) => {
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.bytes().await.map_err(|e| crate::error::GatewayError::Upstream(e.to_string()))?;
                Ok(ProxyResponse { status, headers, body })
            },
            Err(e) => {
                tracing::warn!(session_id, method = %method, path, target = %url, error = %e, "upstream proxy request failed");
                Err(crate::error::GatewayError::Upstream(e.to_string()))
            },
        }
    }

    /// Drop a session's proxy target. Idempotent.
    pub fn remove(&self, session_id: &str) {
        self.handles.write().remove(session_id);
    }

    /// Drop every registered proxy target, e.g. on module `Stop`.
    pub fn close_all(&self) {
        self.handles.write().clear();
    }
}

impl Default for ReverseProxyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReverseProxyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseProxyManager").field("sessions", &self.handles.read().len()).finish()
    }
}

/// Strip a `/proxy/s/{session_id}` style prefix from a raw request path,
/// returning the remainder (always beginning with `/`).
#[must_use]
pub fn strip_prefix(full_path: &str, session_id: &str) -> String {
    let prefix = format!("/proxy/s/{session_id}");
    let rest = full_path.strip_prefix(&prefix).unwrap_or(full_path);
    if rest.is_empty() {
        "/".to_string()
    } else {
        rest.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_prefix_leaves_rooted_remainder() {
        assert_eq!(strip_prefix("/proxy/s/abc/foo/bar", "abc"), "/foo/bar");
        assert_eq!(strip_prefix("/proxy/s/abc", "abc"), "/");
        assert_eq!(strip_prefix("/proxy/s/abc/", "abc"), "/");
    }

    #[test]
    fn remove_is_idempotent() {
        let manager = ReverseProxyManager::new();
        manager.remove("missing");
    }
}
