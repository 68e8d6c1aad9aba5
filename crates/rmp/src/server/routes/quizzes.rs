use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use staffing::{EmployeeId, QuizId};

use crate::repo::quiz::{Attempt, Quiz, QuizData};
use crate::server::AppState;
use crate::server::extract::{Body, Id, Params};
use crate::server::routes::{ApiResult, created};
use crate::service::access::Access;
use crate::service::quiz::{self, AttemptRequest, AttemptResult, QuizView};
use crate::service::today;

#[derive(Deserialize)]
pub struct AttemptsQuery {
    employee_id: Option<EmployeeId>,
}

pub async fn list(State(state): State<AppState>, access: Access) -> ApiResult<Vec<Quiz>> {
    let quizzes = state.db.call(move |conn| quiz::list(conn, &access)).await?;
    Ok(Json(quizzes))
}

pub async fn create(
    State(state): State<AppState>,
    access: Access,
    Body(data): Body<QuizData>,
) -> crate::Result<(StatusCode, Json<QuizView>)> {
    let quiz = state
        .db
        .transaction(move |tx| quiz::create(tx, &access, &data))
        .await?;
    Ok(created(quiz))
}

pub async fn get(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<QuizId>,
) -> ApiResult<QuizView> {
    let quiz = state.db.call(move |conn| quiz::get(conn, &access, id)).await?;
    Ok(Json(quiz))
}

pub async fn submit_attempt(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<QuizId>,
    Body(request): Body<AttemptRequest>,
) -> crate::Result<(StatusCode, Json<AttemptResult>)> {
    let result = state
        .db
        .transaction(move |tx| quiz::submit_attempt(tx, &access, id, &request, today()))
        .await?;
    Ok(created(result))
}

pub async fn attempts(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<QuizId>,
    Params(query): Params<AttemptsQuery>,
) -> ApiResult<Vec<Attempt>> {
    let attempts = state
        .db
        .call(move |conn| quiz::attempts(conn, &access, id, query.employee_id))
        .await?;
    Ok(Json(attempts))
}
