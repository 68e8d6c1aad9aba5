use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use staffing::{EmployeeId, SkillId};

use crate::repo::skill::{EmployeeSkill, Skill, SkillData};
use crate::server::AppState;
use crate::server::extract::{Body, Id, Params};
use crate::server::routes::{ApiResult, created};
use crate::service::access::Access;
use crate::service::skill::{self, Candidate, SearchQuery, SkillLevel};
use crate::service::today;

pub async fn list(State(state): State<AppState>, access: Access) -> ApiResult<Vec<Skill>> {
    let skills = state.db.call(move |conn| skill::list(conn, &access)).await?;
    Ok(Json(skills))
}

pub async fn create(
    State(state): State<AppState>,
    access: Access,
    Body(data): Body<SkillData>,
) -> crate::Result<(StatusCode, Json<Skill>)> {
    let skill = state
        .db
        .transaction(move |tx| skill::create(tx, &access, &data))
        .await?;
    Ok(created(skill))
}

pub async fn delete(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<SkillId>,
) -> crate::Result<StatusCode> {
    state
        .db
        .transaction(move |tx| skill::delete(tx, &access, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn employee_skills(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
) -> ApiResult<Vec<EmployeeSkill>> {
    let skills = state
        .db
        .call(move |conn| skill::employee_skills(conn, &access, id))
        .await?;
    Ok(Json(skills))
}

pub async fn set_employee_skill(
    State(state): State<AppState>,
    access: Access,
    Id((employee_id, skill_id)): Id<(EmployeeId, SkillId)>,
    Body(level): Body<SkillLevel>,
) -> ApiResult<Vec<EmployeeSkill>> {
    let skills = state
        .db
        .transaction(move |tx| skill::set_employee_skill(tx, &access, employee_id, skill_id, &level))
        .await?;
    Ok(Json(skills))
}

pub async fn remove_employee_skill(
    State(state): State<AppState>,
    access: Access,
    Id((employee_id, skill_id)): Id<(EmployeeId, SkillId)>,
) -> crate::Result<StatusCode> {
    state
        .db
        .transaction(move |tx| skill::remove_employee_skill(tx, &access, employee_id, skill_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search(
    State(state): State<AppState>,
    access: Access,
    Params(query): Params<SearchQuery>,
) -> ApiResult<Vec<Candidate>> {
    let candidates = state
        .db
        .call(move |conn| skill::search(conn, &access, &query, today()))
        .await?;
    Ok(Json(candidates))
}
