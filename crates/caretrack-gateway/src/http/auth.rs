use std::sync::Arc;

use axum::extract::{Form, FromRequest, Request, State};
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use caretrack_auth::{TokenPair, TokenRequest};
use caretrack_core::types::Caregiver;
use caretrack_core::CareError;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::http::error::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct TokenBody {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
}

/// Token request body, accepted as JSON or as an urlencoded form.
/// A request without a body is treated as empty (Basic credentials only).
pub struct TokenForm(pub TokenBody);

impl<S> FromRequest<S> for TokenForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(body) = Form::<TokenBody>::from_request(req, state)
                .await
                .map_err(|e| CareError::validation(e.body_text()))?;
            Ok(Self(body))
        } else if content_type.starts_with("application/json") {
            let Json(body) = Json::<TokenBody>::from_request(req, state)
                .await
                .map_err(|e| CareError::validation(e.body_text()))?;
            Ok(Self(body))
        } else {
            Ok(Self(TokenBody::default()))
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    #[serde(flatten)]
    tokens: TokenPair,
    caregiver: Caregiver,
}

/// POST /api/auth/token, client-credentials grant.
///
/// HTTP Basic credentials win over body fields.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    TokenForm(body): TokenForm,
) -> ApiResult<Response> {
    let mut req = TokenRequest {
        grant_type: body
            .grant_type
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| caretrack_auth::service::CLIENT_CREDENTIALS.to_string()),
        client_id: body.client_id.unwrap_or_default(),
        client_secret: body.client_secret.unwrap_or_default(),
        scope: body.scope,
    };
    if let Some((id, secret)) = basic_credentials(&headers) {
        req.client_id = id;
        req.client_secret = secret;
    }

    let issued = state.auth.issue_token(req).await?;
    let body = TokenResponse {
        tokens: issued.tokens,
        caregiver: issued.caregiver,
    };
    Ok((
        [(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")],
        Json(body),
    )
        .into_response())
}

/// `Authorization: Basic base64(id:secret)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}
