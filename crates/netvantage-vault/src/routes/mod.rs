//! Axum handlers for the vault's HTTP surface, mounted by the host under
//! `/api/v1/vault`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::VaultError;
use crate::model::CredentialType;
use crate::vault::VaultState;

fn error_response(err: &VaultError) -> Response {
    let problem = err.to_problem();
    let status = StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(problem)).into_response()
}

type HandlerResult<T> = Result<Json<T>, Response>;

/// Build the vault's axum router over shared `state`.
#[must_use]
pub fn router(state: Arc<VaultState>) -> Router {
    Router::new()
        .route("/credentials", get(list_credentials).post(create_credential))
        .route("/credentials/:id", get(get_credential).put(update_credential).delete(delete_credential))
        .route("/credentials/:id/data", get(get_credential_data))
        .route("/credentials/device/:device_id", get(list_by_device))
        .route("/rotate-keys", post(rotate_keys))
        .route("/seal", post(seal))
        .route("/unseal", post(unseal))
        .route("/status", get(status))
        .route("/audit", get(audit_all))
        .route("/audit/:credential_id", get(audit_for_credential))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateCredentialRequest {
    name: String,
    #[serde(rename = "type")]
    kind: CredentialType,
    data: serde_json::Value,
    device_id: Option<String>,
    description: Option<String>,
}

async fn create_credential(
    State(state): State<Arc<VaultState>>,
    Json(req): Json<CreateCredentialRequest>,
) -> Result<Json<crate::model::CredentialMetadata>, Response> {
    state
        .create_credential(req.name, req.kind, req.data, req.device_id, req.description)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn list_credentials(State(state): State<Arc<VaultState>>) -> HandlerResult<Vec<crate::model::CredentialMetadata>> {
    state.list_all().await.map(Json).map_err(|e| error_response(&e))
}

async fn get_credential(State(state): State<Arc<VaultState>>, Path(id): Path<String>) -> HandlerResult<crate::model::CredentialMetadata> {
    state.get_metadata(&id).await.map(Json).map_err(|e| error_response(&e))
}

async fn list_by_device(
    State(state): State<Arc<VaultState>>,
    Path(device_id): Path<String>,
) -> HandlerResult<Vec<crate::model::CredentialMetadata>> {
    state.list_by_device(&device_id).await.map(Json).map_err(|e| error_response(&e))
}

#[derive(Debug, Deserialize)]
struct UpdateCredentialRequest {
    name: Option<String>,
    description: Option<String>,
    device_id: Option<String>,
    data: Option<serde_json::Value>,
}

async fn update_credential(
    State(state): State<Arc<VaultState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCredentialRequest>,
) -> HandlerResult<crate::model::CredentialMetadata> {
    state
        .update_credential(&id, req.name, req.description, req.device_id, req.data)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn delete_credential(State(state): State<Arc<VaultState>>, Path(id): Path<String>) -> Result<StatusCode, Response> {
    state.delete_credential(&id).await.map(|()| StatusCode::NO_CONTENT).map_err(|e| error_response(&e))
}

#[derive(Debug, Deserialize)]
struct DataQuery {
    purpose: Option<String>,
}

async fn get_credential_data(
    State(state): State<Arc<VaultState>>,
    Path(id): Path<String>,
    Query(query): Query<DataQuery>,
) -> HandlerResult<serde_json::Value> {
    state.get_data(&id, None, query.purpose, None).await.map(Json).map_err(|e| error_response(&e))
}

#[derive(Debug, Deserialize)]
struct PassphraseRequest {
    passphrase: String,
}

async fn unseal(State(state): State<Arc<VaultState>>, Json(req): Json<PassphraseRequest>) -> Result<StatusCode, Response> {
    state.unseal(&req.passphrase).await.map(|()| StatusCode::NO_CONTENT).map_err(|e| error_response(&e))
}

async fn seal(State(state): State<Arc<VaultState>>) -> StatusCode {
    state.seal().await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct RotateKeysRequest {
    new_passphrase: String,
}

async fn rotate_keys(State(state): State<Arc<VaultState>>, Json(req): Json<RotateKeysRequest>) -> Result<StatusCode, Response> {
    state.rotate_keys(&req.new_passphrase).await.map(|()| StatusCode::NO_CONTENT).map_err(|e| error_response(&e))
}

async fn status(State(state): State<Arc<VaultState>>) -> HandlerResult<crate::model::VaultStatus> {
    state.status().await.map(Json).map_err(|e| error_response(&e))
}

async fn audit_for_credential(
    State(state): State<Arc<VaultState>>,
    Path(credential_id): Path<String>,
) -> HandlerResult<Vec<netvantage_audit::AuditEntry>> {
    state.audit_for_credential(&credential_id).await.map(Json).map_err(|e| error_response(&e))
}

async fn audit_all(State(state): State<Arc<VaultState>>) -> HandlerResult<Vec<netvantage_audit::AuditEntry>> {
    let credentials = state.list_all().await.map_err(|e| error_response(&e))?;
    let mut entries = Vec::new();
    for credential in credentials {
        entries.extend(state.audit_for_credential(&credential.id).await.map_err(|e| error_response(&e))?);
    }
    Ok(Json(entries))
}
