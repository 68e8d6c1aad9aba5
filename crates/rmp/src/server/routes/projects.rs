use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Deserialize;
use staffing::ProjectId;

use crate::repo::project::{Project, ProjectData, ProjectStatus};
use crate::server::AppState;
use crate::server::extract::{Body, Id, Params};
use crate::server::routes::{ApiResult, created};
use crate::service::access::Access;
use crate::service::project::{self, ProjectStaffing};
use crate::service::today;

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<ProjectStatus>,
}

#[derive(Deserialize)]
pub struct OnQuery {
    on: Option<NaiveDate>,
}

pub async fn list(
    State(state): State<AppState>,
    access: Access,
    Params(query): Params<ListQuery>,
) -> ApiResult<Vec<Project>> {
    let projects = state
        .db
        .call(move |conn| project::list(conn, &access, query.status))
        .await?;
    Ok(Json(projects))
}

pub async fn create(
    State(state): State<AppState>,
    access: Access,
    Body(data): Body<ProjectData>,
) -> crate::Result<(StatusCode, Json<Project>)> {
    let project = state
        .db
        .transaction(move |tx| project::create(tx, &access, &data))
        .await?;
    Ok(created(project))
}

pub async fn get(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<ProjectId>,
) -> ApiResult<Project> {
    let project = state
        .db
        .call(move |conn| project::get(conn, &access, id))
        .await?;
    Ok(Json(project))
}

pub async fn update(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<ProjectId>,
    Body(data): Body<ProjectData>,
) -> ApiResult<Project> {
    let project = state
        .db
        .transaction(move |tx| project::update(tx, &access, id, &data))
        .await?;
    Ok(Json(project))
}

pub async fn delete(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<ProjectId>,
) -> crate::Result<StatusCode> {
    state
        .db
        .transaction(move |tx| project::delete(tx, &access, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn staffing(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<ProjectId>,
    Params(query): Params<OnQuery>,
) -> ApiResult<ProjectStaffing> {
    let on = query.on.unwrap_or_else(today);
    let staffing = state
        .db
        .call(move |conn| project::staffing(conn, &access, id, on))
        .await?;
    Ok(Json(staffing))
}
