//! Extractors that report malformed input as [`RmpError`] so that every
//! failure has the same JSON shape.

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::common::error::RmpError;
use crate::server::AppState;
use crate::service::access::Access;
use crate::service::auth;

/// JSON request body.
pub struct Body<T>(pub T);

/// Query string parameters.
pub struct Params<T>(pub T);

/// Path parameters.
pub struct Id<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RmpError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| RmpError::validation(rejection.body_text()))?;
        Ok(Body(value))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RmpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| RmpError::validation(rejection.body_text()))?;
        Ok(Params(value))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Id<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RmpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| RmpError::validation(rejection.body_text()))?;
        Ok(Id(value))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// The authenticated caller together with the permission matrix in effect.
#[axum::async_trait]
impl FromRequestParts<AppState> for Access {
    type Rejection = RmpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(RmpError::Unauthenticated)?;
        let principal = state
            .db
            .call(move |conn| auth::authenticate(conn, &token))
            .await?;
        Ok(Access::new(principal, state.matrix()?))
    }
}
