use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::report::{self, ReportFormat, ReportKind};
use crate::server::AppState;
use crate::server::extract::{Id, Params};
use crate::service::access::Access;
use crate::service::today;

#[derive(Deserialize)]
pub struct ReportQuery {
    format: Option<ReportFormat>,
    on: Option<NaiveDate>,
}

pub async fn download(
    State(state): State<AppState>,
    access: Access,
    Id(kind): Id<ReportKind>,
    Params(query): Params<ReportQuery>,
) -> crate::Result<impl IntoResponse> {
    let format = query.format.unwrap_or(ReportFormat::Xlsx);
    let on = query.on.unwrap_or_else(today);
    let table = state
        .db
        .call(move |conn| report::build(conn, &access, kind, on))
        .await?;
    // Rendering does not need the connection, keep it free for other requests.
    let content = tokio::task::spawn_blocking(move || report::render(&table, format)).await??;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        report::file_name(kind, format, on)
    );
    Ok((
        [
            (CONTENT_TYPE, format.content_type().to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        content,
    ))
}
