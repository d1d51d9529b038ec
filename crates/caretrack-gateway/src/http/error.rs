use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use caretrack_core::CareError;
use serde_json::json;
use tracing::error;

/// Handler error: a `CareError` rendered as `{"error": CODE, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub CareError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CareError::NotFound => StatusCode::NOT_FOUND,
            CareError::InvalidStatusTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CareError::Validation(_) => StatusCode::BAD_REQUEST,
            CareError::Forbidden => StatusCode::FORBIDDEN,
            CareError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CareError::Config(_) | CareError::Database(_) | CareError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<CareError> for ApiError {
    fn from(err: CareError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let mut resp = (
            status,
            Json(json!({ "error": self.0.code(), "message": message })),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            resp.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        resp
    }
}
