//! HTTP API.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use staffing::permission::PermissionMatrix;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::common::config::Config;
use crate::common::error::RmpError;
use crate::db::Database;
use crate::zoho::ZohoApi;

pub mod bootstrap;
pub mod error;
pub mod extract;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Effective permission matrix, replaced whenever an override changes.
    pub permissions: Arc<RwLock<PermissionMatrix>>,
    pub zoho: Option<Arc<dyn ZohoApi>>,
}

impl AppState {
    pub fn new(db: Database, matrix: PermissionMatrix, zoho: Option<Arc<dyn ZohoApi>>) -> Self {
        AppState {
            db,
            permissions: Arc::new(RwLock::new(matrix)),
            zoho,
        }
    }

    pub fn matrix(&self) -> crate::Result<PermissionMatrix> {
        self.permissions
            .read()
            .map(|matrix| matrix.clone())
            .map_err(|_| RmpError::GenericError("Permission matrix lock was poisoned".to_string()))
    }

    pub fn replace_matrix(&self, matrix: PermissionMatrix) -> crate::Result<()> {
        let mut current = self
            .permissions
            .write()
            .map_err(|_| RmpError::GenericError("Permission matrix lock was poisoned".to_string()))?;
        *current = matrix;
        Ok(())
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status();
    let elapsed = started.elapsed();
    if status.is_server_error() {
        log::warn!("{method} {path} -> {status} ({elapsed:?})");
    } else {
        log::debug!("{method} {path} -> {status} ({elapsed:?})");
    }
    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(Duration::from_secs(60 * 60));
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin `{origin}`");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn create_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(middleware::from_fn(log_request))
        .layer(cors_layer(&config.server.cors_origins))
        .with_state(state)
}
