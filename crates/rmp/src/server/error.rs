use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use staffing::common::error::StaffingError;

use crate::common::error::RmpError;

pub fn status_code(error: &RmpError) -> StatusCode {
    match error {
        RmpError::NotFound { .. } => StatusCode::NOT_FOUND,
        RmpError::ValidationError(_) => StatusCode::BAD_REQUEST,
        RmpError::Conflict(_) => StatusCode::CONFLICT,
        RmpError::Unauthenticated => StatusCode::UNAUTHORIZED,
        RmpError::Forbidden { .. } => StatusCode::FORBIDDEN,
        RmpError::StaffingError(error) => match error {
            StaffingError::OverAllocated { .. } => StatusCode::CONFLICT,
            StaffingError::InvalidFte(_)
            | StaffingError::InvalidPeriod { .. }
            | StaffingError::UnknownName { .. }
            | StaffingError::ImmutableRole => StatusCode::BAD_REQUEST,
        },
        RmpError::IoError(_)
        | RmpError::DatabaseError(_)
        | RmpError::SerializationError(_)
        | RmpError::DeserializationError(_)
        | RmpError::ReportError(_)
        | RmpError::ZohoError(_)
        | RmpError::GenericError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RmpError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        }
        let mut body = json!({ "error": self.to_string() });
        if let RmpError::StaffingError(StaffingError::OverAllocated {
            date,
            load,
            capacity,
        }) = &self
        {
            body["date"] = json!(date);
            body["load"] = json!(load);
            body["capacity"] = json!(capacity);
        }
        (status, Json(body)).into_response()
    }
}
