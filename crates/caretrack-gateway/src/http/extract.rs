//! Request extractors: the authenticated caller and body/query parsers that
//! report malformed input as validation failures.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use caretrack_auth::AccessClaims;
use caretrack_core::CareError;
use serde::de::DeserializeOwned;

use crate::app::AppState;
use crate::http::error::ApiError;

/// The caregiver behind a verified bearer access token.
#[derive(Debug, Clone)]
pub struct Caller {
    pub caregiver_id: String,
    pub claims: AccessClaims,
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| CareError::unauthorized("missing bearer token"))?;
        let claims = state.auth.verify_access_token(token)?;
        Ok(Self {
            caregiver_id: claims.sub.clone(),
            claims,
        })
    }
}

/// Value of an `Authorization: Bearer <token>` header. Scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// `Json<T>` whose rejection is a validation failure.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| CareError::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query<T>` whose rejection is a validation failure.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| CareError::validation(e.body_text()))?;
        Ok(Self(value))
    }
}
