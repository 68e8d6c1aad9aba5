use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use staffing::{CertificationId, CourseId, EmployeeId, EnrollmentId};

use crate::repo::training::{
    Certification, CertificationData, Course, CourseData, Enrollment, ExpiringCertification,
};
use crate::server::AppState;
use crate::server::extract::{Body, Id, Params};
use crate::server::routes::{ApiResult, created};
use crate::service::access::Access;
use crate::service::today;
use crate::service::training::{self, EnrollmentUpdate};

const DEFAULT_EXPIRY_DAYS: u32 = 30;

/// Without a body the caller enrolls themselves.
#[derive(Deserialize, Default)]
pub struct EnrollRequest {
    #[serde(default)]
    employee_id: Option<EmployeeId>,
}

#[derive(Deserialize)]
pub struct ExpiringQuery {
    within_days: Option<u32>,
}

pub async fn list_courses(State(state): State<AppState>, access: Access) -> ApiResult<Vec<Course>> {
    let courses = state
        .db
        .call(move |conn| training::list_courses(conn, &access))
        .await?;
    Ok(Json(courses))
}

pub async fn create_course(
    State(state): State<AppState>,
    access: Access,
    Body(data): Body<CourseData>,
) -> crate::Result<(StatusCode, Json<Course>)> {
    let course = state
        .db
        .transaction(move |tx| training::create_course(tx, &access, &data))
        .await?;
    Ok(created(course))
}

pub async fn get_course(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<CourseId>,
) -> ApiResult<Course> {
    let course = state
        .db
        .call(move |conn| training::get_course(conn, &access, id))
        .await?;
    Ok(Json(course))
}

pub async fn enroll(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<CourseId>,
    body: Option<Body<EnrollRequest>>,
) -> crate::Result<(StatusCode, Json<Enrollment>)> {
    let request = body.map(|Body(request)| request).unwrap_or_default();
    let enrollment = state
        .db
        .transaction(move |tx| training::enroll(tx, &access, id, request.employee_id, today()))
        .await?;
    Ok(created(enrollment))
}

pub async fn update_enrollment(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EnrollmentId>,
    Body(change): Body<EnrollmentUpdate>,
) -> ApiResult<Enrollment> {
    let enrollment = state
        .db
        .transaction(move |tx| training::update_enrollment(tx, &access, id, &change, today()))
        .await?;
    Ok(Json(enrollment))
}

pub async fn enrollments(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
) -> ApiResult<Vec<Enrollment>> {
    let enrollments = state
        .db
        .call(move |conn| training::enrollments(conn, &access, id))
        .await?;
    Ok(Json(enrollments))
}

pub async fn certifications(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
) -> ApiResult<Vec<Certification>> {
    let certifications = state
        .db
        .call(move |conn| training::certifications(conn, &access, id))
        .await?;
    Ok(Json(certifications))
}

pub async fn add_certification(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<EmployeeId>,
    Body(data): Body<CertificationData>,
) -> crate::Result<(StatusCode, Json<Certification>)> {
    let certification = state
        .db
        .transaction(move |tx| training::add_certification(tx, &access, id, &data))
        .await?;
    Ok(created(certification))
}

pub async fn delete_certification(
    State(state): State<AppState>,
    access: Access,
    Id(id): Id<CertificationId>,
) -> crate::Result<StatusCode> {
    state
        .db
        .transaction(move |tx| training::delete_certification(tx, &access, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn expiring(
    State(state): State<AppState>,
    access: Access,
    Params(query): Params<ExpiringQuery>,
) -> ApiResult<Vec<ExpiringCertification>> {
    let within_days = query.within_days.unwrap_or(DEFAULT_EXPIRY_DAYS);
    let certifications = state
        .db
        .call(move |conn| training::expiring(conn, &access, within_days, today()))
        .await?;
    Ok(Json(certifications))
}
