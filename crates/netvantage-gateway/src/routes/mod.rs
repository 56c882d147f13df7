//! Axum handlers for the gateway's HTTP surface, mounted by the host under
//! `/api/v1/gateway`. The WebSocket SSH route is mounted separately by the
//! host at `/ws/gateway/ssh/:device_id` (see [`crate::plugin::GatewayPlugin`]).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::model::{GatewayStatus, SessionKind, Target};
use crate::state::GatewayState;

fn error_response(err: &GatewayError) -> Response {
    let problem = err.to_problem();
    let status = StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(problem)).into_response()
}

fn bearer_token(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

type HandlerResult<T> = Result<Json<T>, Response>;

/// Build the gateway's axum router over shared `state`.
#[must_use]
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/status", get(status))
        .route("/audit", get(audit_all))
        .route("/proxy/:device_id", axum::routing::post(create_proxy))
        .route("/proxy/s/:session_id/*path", any(proxy_traffic))
        .route("/proxy/s/:session_id", any(proxy_traffic_root))
        .with_state(state)
}

async fn list_sessions(State(state): State<Arc<GatewayState>>) -> Json<Vec<crate::model::SessionSnapshot>> {
    Json(state.sessions.list().iter().map(|s| s.snapshot()).collect())
}

async fn get_session(State(state): State<Arc<GatewayState>>, Path(id): Path<String>) -> HandlerResult<crate::model::SessionSnapshot> {
    state.sessions.get(&id).map(|s| Json(s.snapshot())).ok_or_else(|| error_response(&GatewayError::NotFound(id)))
}

async fn delete_session(State(state): State<Arc<GatewayState>>, Path(id): Path<String>) -> Result<StatusCode, Response> {
    match state.sessions.delete(&id) {
        Some(_) => {
            state.proxies.remove(&id);
            state.audit.append_best_effort(id.clone(), None, "closed:disconnected", None, None).await;
            state.event_bus.publish_async("gateway.session.closed", "gateway", serde_json::json!({ "session_id": id }));
            Ok(StatusCode::NO_CONTENT)
        },
        None => Err(error_response(&GatewayError::NotFound(id))),
    }
}

async fn status(State(state): State<Arc<GatewayState>>) -> Json<GatewayStatus> {
    Json(GatewayStatus { active_sessions: state.sessions.count(), max_sessions: state.sessions.max_sessions() })
}

async fn audit_all(State(state): State<Arc<GatewayState>>) -> HandlerResult<Vec<netvantage_audit::AuditEntry>> {
    let mut entries = Vec::new();
    for session in state.sessions.list() {
        entries.extend(state.audit.entries_for_subject(&session.id).await.map_err(|e| error_response(&GatewayError::Storage(e.to_string())))?);
    }
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
struct CreateProxyRequest {
    host: Option<String>,
    port: Option<u16>,
    #[serde(default = "default_scheme")]
    scheme: String,
    ttl_seconds: Option<i64>,
}

fn default_scheme() -> String {
    "http".to_string()
}

#[derive(Debug, serde::Serialize)]
struct CreateProxyResponse {
    session: crate::model::SessionSnapshot,
    proxy_url: String,
}

async fn create_proxy(
    State(state): State<Arc<GatewayState>>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateProxyRequest>,
) -> Result<(StatusCode, Json<CreateProxyResponse>), Response> {
    let identity = state.validate_token(&bearer_token(&headers)).await.map_err(|e| error_response(&e))?;

    let target: Target = state.resolve_target(&device_id, req.host, req.port).await.map_err(|e| error_response(&e))?;

    let ttl = chrono::Duration::seconds(req.ttl_seconds.unwrap_or(state.config.session_ttl.num_seconds()));
    let session = state
        .sessions
        .create(Some(device_id), identity.user_id.clone(), SessionKind::HttpProxy, target, None, ttl)
        .map_err(|e| error_response(&e))?;

    state.proxies.create(&session, &req.scheme);
    state.audit.append_best_effort(session.id.clone(), Some(identity.user_id), "created", None, None).await;
    state.event_bus.publish_async("gateway.session.created", "gateway", serde_json::json!({ "session_id": session.id }));

    let proxy_url = format!("/proxy/s/{}/", session.id);
    Ok((StatusCode::CREATED, Json(CreateProxyResponse { session: session.snapshot(), proxy_url })))
}

async fn proxy_traffic_root(
    state: State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
    method: Method,
    query: axum::extract::RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    serve_proxy(state, session_id, "/".to_string(), method, query, headers, body).await
}

async fn proxy_traffic(
    state: State<Arc<GatewayState>>,
    Path((session_id, path)): Path<(String, String)>,
    method: Method,
    query: axum::extract::RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = format!("/{path}");
    serve_proxy(state, session_id, path, method, query, headers, body).await
}

async fn serve_proxy(
    State(state): State<Arc<GatewayState>>,
    session_id: String,
    path: String,
    method: Method,
    query: axum::extract::RawQuery,
    mut headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(session) = state.sessions.get(&session_id) else {
        return error_response(&GatewayError::NotFound(session_id));
    };
    if session.is_expired(netvantage_core::Timestamp::now()) {
        state.sessions.delete(&session_id);
        state.proxies.remove(&session_id);
        return error_response(&GatewayError::Expired(session_id));
    }

    headers.remove(axum::http::header::HOST);
    match state.proxies.serve(&session_id, method, &path, query.0.as_deref(), headers, body).await {
        Ok(response) => {
            let mut builder = Response::builder().status(response.status);
            for (name, value) in response.headers.iter() {
                builder = builder.header(name, value);
            }
            builder.body(axum::body::Body::from(response.body)).unwrap_or_else(|_| error_response(&GatewayError::Upstream("malformed upstream response".into())))
        },
        Err(e) => error_response(&e),
    }
}
