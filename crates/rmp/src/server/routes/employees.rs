use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use staffing::availability::{Availability, AvailabilityStatus};
use staffing::{EmployeeId, Period};

use crate::repo::employee::{Employee, EmployeeData, EmployeeFilter};
use crate::server::AppState;
use crate::server::extract::{Body, Id, Params};
use crate::server::routes::{ApiResult, created};
use crate::service::access::Access;
use crate::service::employee::{self, Deactivation, EmployeeWithAvailability, Timeline};
use crate::service::today;

#[derive(Deserialize)]
pub struct ListQuery {
    department: Option<String>,
    active: Option<bool>,
    status: Option<AvailabilityStatus>,
    on: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct OnQuery {
    on: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    on: Option<NaiveDate>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct DeactivateQuery {
    exit_date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum AvailabilityResponse {
    Day(Availability),
    Timeline(Timeline),
}

pub async fn list(
    State(state): State<AppState>,
    access: Access,
    Params(query): Params<ListQuery>,
) -> ApiResult<Vec<EmployeeWithAvailability>> {
    let on = query.on.unwrap_or_else(today);
    // `active=true` means employed on the requested day, notice periods included
    let filter = EmployeeFilter {
        department: query.department,
        active: query.active.filter(|active| !active),
        employed_on: query.active.filter(|active| *active).map(|_| on),
    };
    let employees = state
        .db
        .call(move |conn| employee::list_with_availability(conn, &access, &filter, query.status, on))
        .await?;
    Ok(Json(employees))
}

pub async fn bench(
    State(state): State<AppState>,
    access: Access,
    Params(query): Params<OnQuery>,
) -> ApiResult<Vec<EmployeeWithAvailability>> {
    let on = query.on.unwrap_or_else(today);
    let employees = state
        .db
        .call(move |conn| employee::bench(conn, &access, on))
        .await?;
    Ok(Json(employees))
}

pub async fn create(
    State(state): State<AppState>,
    access: Access,
    Body(data): Body<EmployeeData>,
) -> crate::Result<(StatusCode, Json<Employee>)> {
    let employee = state
        .db
        .transaction(move |tx| employee::create(tx, &access, &data))
        .await?;
    Ok(created(employee))
}

pub async fn get(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
) -> ApiResult<Employee> {
    let employee = state
        .db
        .call(move |conn| employee::get(conn, &access, id))
        .await?;
    Ok(Json(employee))
}

pub async fn update(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
    Body(data): Body<EmployeeData>,
) -> ApiResult<Employee> {
    let employee = state
        .db
        .transaction(move |tx| employee::update(tx, &access, id, &data))
        .await?;
    Ok(Json(employee))
}

pub async fn deactivate(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
    Params(query): Params<DeactivateQuery>,
) -> ApiResult<Deactivation> {
    let deactivation = state
        .db
        .transaction(move |tx| employee::deactivate(tx, &access, id, query.exit_date))
        .await?;
    Ok(Json(deactivation))
}

pub async fn availability(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
    Params(query): Params<AvailabilityQuery>,
) -> ApiResult<AvailabilityResponse> {
    let response = match query.from {
        Some(from) => {
            let window = Period::new(from, query.to)?;
            let timeline = state
                .db
                .call(move |conn| employee::timeline(conn, &access, id, &window))
                .await?;
            AvailabilityResponse::Timeline(timeline)
        }
        None => {
            let on = query.on.unwrap_or_else(today);
            let availability = state
                .db
                .call(move |conn| employee::availability(conn, &access, id, on))
                .await?;
            AvailabilityResponse::Day(availability)
        }
    };
    Ok(Json(response))
}
