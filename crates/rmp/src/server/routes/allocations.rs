use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use staffing::{AllocationId, Period};

use crate::repo::allocation::{Allocation, AllocationDetail, AllocationFilter};
use crate::server::AppState;
use crate::server::extract::{Body, Id, Params};
use crate::server::routes::{ApiResult, created};
use crate::service::access::Access;
use crate::service::allocation::{self, AllocationRequest, OverAllocation};
use crate::service::today;

/// Window of the over-allocation query when no end is given.
const DEFAULT_WINDOW_DAYS: u64 = 90;

#[derive(Deserialize)]
pub struct WindowQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

pub async fn list(
    State(state): State<AppState>,
    access: Access,
    Params(filter): Params<AllocationFilter>,
) -> ApiResult<Vec<AllocationDetail>> {
    let allocations = state
        .db
        .call(move |conn| allocation::list(conn, &access, &filter))
        .await?;
    Ok(Json(allocations))
}

pub async fn create(
    State(state): State<AppState>,
    access: Access,
    Body(request): Body<AllocationRequest>,
) -> crate::Result<(StatusCode, Json<Allocation>)> {
    let allocation = state
        .db
        .transaction(move |tx| allocation::create(tx, &access, &request))
        .await?;
    Ok(created(allocation))
}

pub async fn over_allocated(
    State(state): State<AppState>,
    access: Access,
    Params(query): Params<WindowQuery>,
) -> ApiResult<Vec<OverAllocation>> {
    let from = query.from.unwrap_or_else(today);
    let to = query
        .to
        .or_else(|| from.checked_add_days(Days::new(DEFAULT_WINDOW_DAYS)));
    let window = Period::new(from, to)?;
    let result = state
        .db
        .call(move |conn| allocation::over_allocations(conn, &access, &window))
        .await?;
    Ok(Json(result))
}

pub async fn get(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<AllocationId>,
) -> ApiResult<Allocation> {
    let allocation = state
        .db
        .call(move |conn| allocation::get(conn, &access, id))
        .await?;
    Ok(Json(allocation))
}

pub async fn update(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<AllocationId>,
    Body(request): Body<AllocationRequest>,
) -> ApiResult<Allocation> {
    let allocation = state
        .db
        .transaction(move |tx| allocation::update(tx, &access, id, &request))
        .await?;
    Ok(Json(allocation))
}

pub async fn release(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<AllocationId>,
) -> ApiResult<Allocation> {
    let allocation = state
        .db
        .transaction(move |tx| allocation::release(tx, &access, id))
        .await?;
    Ok(Json(allocation))
}

pub async fn delete(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<AllocationId>,
) -> crate::Result<StatusCode> {
    state
        .db
        .transaction(move |tx| allocation::delete(tx, &access, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
