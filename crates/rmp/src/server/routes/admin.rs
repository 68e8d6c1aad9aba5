use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use staffing::permission::{Actions, Module, PermissionCell, Role};

use crate::common::error::RmpError;
use crate::repo::audit::AuditEntry;
use crate::server::AppState;
use crate::server::extract::{Body, Id, Params};
use crate::server::routes::ApiResult;
use crate::service::access::{Access, Principal};
use crate::service::{audit, permission};
use crate::zoho::{SyncSummary, sync_projects};

#[derive(Serialize)]
pub struct Me {
    #[serde(flatten)]
    principal: Principal,
    permissions: BTreeMap<Module, Vec<&'static str>>,
}

#[derive(Deserialize)]
pub struct PermissionRequest {
    actions: Vec<String>,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    module: Option<Module>,
    limit: Option<u32>,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::RMP_VERSION,
    }))
}

pub async fn me(access: Access) -> Json<Me> {
    let role = access.role();
    let permissions = Module::ALL
        .iter()
        .map(|module| (*module, access.matrix.actions(role, *module).names()))
        .filter(|(_, actions)| !actions.is_empty())
        .collect();
    Json(Me {
        principal: access.principal,
        permissions,
    })
}

pub async fn permissions(access: Access) -> ApiResult<Vec<PermissionCell>> {
    Ok(Json(permission::cells(&access)?))
}

pub async fn set_permission(
    State(state): State<AppState>,
    access: Access,
    Id((role, module)): Id<(Role, Module)>,
    Body(request): Body<PermissionRequest>,
) -> ApiResult<Vec<PermissionCell>> {
    let actions = Actions::from_names(&request.actions)?;
    let matrix = state
        .db
        .transaction(move |tx| permission::set(tx, &access, role, module, actions))
        .await?;
    let cells = matrix.cells();
    state.replace_matrix(matrix)?;
    Ok(Json(cells))
}

pub async fn clear_permission(
    State(state): State<AppState>,
    access: Access,
    Id((role, module)): Id<(Role, Module)>,
) -> ApiResult<Vec<PermissionCell>> {
    let matrix = state
        .db
        .transaction(move |tx| permission::clear(tx, &access, role, module))
        .await?;
    let cells = matrix.cells();
    state.replace_matrix(matrix)?;
    Ok(Json(cells))
}

pub async fn zoho_sync(State(state): State<AppState>, access: Access) -> ApiResult<SyncSummary> {
    let api = state
        .zoho
        .clone()
        .ok_or_else(|| RmpError::Conflict("Zoho integration is not configured".to_string()))?;
    let summary = sync_projects(&state.db, access, api.as_ref()).await?;
    Ok(Json(summary))
}

pub async fn audit(
    State(state): State<AppState>,
    access: Access,
    Params(query): Params<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let entries = state
        .db
        .call(move |conn| audit::list(conn, &access, query.module, query.limit))
        .await?;
    Ok(Json(entries))
}
