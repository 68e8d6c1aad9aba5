use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use serde::Serialize;

use crate::server::AppState;

mod admin;
mod allocations;
mod employees;
mod projects;
mod quizzes;
mod reports;
mod skills;
mod training;

pub(crate) type ApiResult<T> = crate::Result<Json<T>>;

pub(crate) fn created<T: Serialize>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(admin::health))
        .route("/me", get(admin::me))
        .route("/employees", get(employees::list).post(employees::create))
        .route("/employees/bench", get(employees::bench))
        .route(
            "/employees/:id",
            get(employees::get)
                .put(employees::update)
                .delete(employees::deactivate),
        )
        .route("/employees/:id/availability", get(employees::availability))
        .route("/employees/:id/skills", get(skills::employee_skills))
        .route(
            "/employees/:id/skills/:skill_id",
            put(skills::set_employee_skill).delete(skills::remove_employee_skill),
        )
        .route("/employees/:id/enrollments", get(training::enrollments))
        .route(
            "/employees/:id/certifications",
            get(training::certifications).post(training::add_certification),
        )
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/:id",
            get(projects::get).put(projects::update).delete(projects::delete),
        )
        .route("/projects/:id/staffing", get(projects::staffing))
        .route("/allocations", get(allocations::list).post(allocations::create))
        .route("/allocations/over-allocated", get(allocations::over_allocated))
        .route(
            "/allocations/:id",
            get(allocations::get)
                .put(allocations::update)
                .delete(allocations::delete),
        )
        .route("/allocations/:id/release", post(allocations::release))
        .route("/skills", get(skills::list).post(skills::create))
        .route("/skills/:id", axum::routing::delete(skills::delete))
        .route("/staffing/search", get(skills::search))
        .route("/courses", get(training::list_courses).post(training::create_course))
        .route("/courses/:id", get(training::get_course))
        .route("/courses/:id/enrollments", post(training::enroll))
        .route("/enrollments/:id", put(training::update_enrollment))
        .route("/certifications/expiring", get(training::expiring))
        .route(
            "/certifications/:id",
            axum::routing::delete(training::delete_certification),
        )
        .route("/quizzes", get(quizzes::list).post(quizzes::create))
        .route("/quizzes/:id", get(quizzes::get))
        .route(
            "/quizzes/:id/attempts",
            get(quizzes::attempts).post(quizzes::submit_attempt),
        )
        .route("/reports/:kind", get(reports::download))
        .route("/permissions", get(admin::permissions))
        .route(
            "/permissions/:role/:module",
            put(admin::set_permission).delete(admin::clear_permission),
        )
        .route("/integrations/zoho/sync", post(admin::zoho_sync))
        .route("/audit", get(admin::audit))
}
