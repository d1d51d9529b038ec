use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use caretrack_core::types::LogType;
use caretrack_visits::HistoryFilter;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::dto::{parse_optional_date, CaregiverLogResponse, ClockRequest};
use crate::http::error::ApiResult;
use crate::http::extract::{Caller, ValidJson, ValidQuery};

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub log_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /api/attendance/today/status
pub async fn today_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<Value>> {
    let status = state
        .visits
        .attendance
        .today_status(&caller.caregiver_id)
        .await?;
    Ok(Json(json!({ "data": status })))
}

/// POST /api/attendance/clock-in
pub async fn clock_in(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidJson(req): ValidJson<ClockRequest>,
) -> ApiResult<Json<Value>> {
    let point = req.point()?;
    let log = state
        .visits
        .attendance
        .clock_in(&caller.caregiver_id, point.latitude, point.longitude, req.notes)
        .await?;
    Ok(Json(json!({ "data": CaregiverLogResponse::from(&log) })))
}

/// POST /api/attendance/clock-out
pub async fn clock_out(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidJson(req): ValidJson<ClockRequest>,
) -> ApiResult<Json<Value>> {
    let point = req.point()?;
    let log = state
        .visits
        .attendance
        .clock_out(&caller.caregiver_id, point.latitude, point.longitude, req.notes)
        .await?;
    Ok(Json(json!({ "data": CaregiverLogResponse::from(&log) })))
}

/// GET /api/attendance/history
pub async fn history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidQuery(params): ValidQuery<HistoryParams>,
) -> ApiResult<Json<Value>> {
    let log_type = match params.log_type.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => Some(t.parse::<LogType>()?),
        _ => None,
    };
    let filter = HistoryFilter {
        log_type,
        start_date: parse_optional_date("start_date", params.start_date.as_deref())?,
        end_date: parse_optional_date("end_date", params.end_date.as_deref())?,
        limit: params.limit.unwrap_or(0),
        offset: params.offset.unwrap_or(0),
    };
    let logs = state
        .visits
        .attendance
        .history(&caller.caregiver_id, &filter)
        .await?;
    Ok(Json(json!({ "data": logs })))
}

#[cfg(test)]
mod tests {
    use crate::app::testing::{at, test_app, TestApp};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use caretrack_core::config::CaretrackConfig;
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = app.token("app-1").await;
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.router().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn here() -> Option<Value> {
        Some(json!({"latitude": 51.5, "longitude": -0.12}))
    }

    #[tokio::test]
    async fn shift_day_flow() {
        let app = test_app(CaretrackConfig::default());

        let (status, body) = call(&app, Method::GET, "/api/attendance/today/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["has_clocked_in"], false);

        let (status, _) = call(&app, Method::POST, "/api/attendance/clock-out", here()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, Method::POST, "/api/attendance/clock-in", here()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["log_type"], "clock_in");
        assert_eq!(body["data"]["latitude"], 51.5);

        let (status, _) = call(&app, Method::POST, "/api/attendance/clock-in", here()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        app.clock.advance(Duration::hours(8));
        let (status, _) = call(&app, Method::POST, "/api/attendance/clock-out", here()).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::GET, "/api/attendance/today/status", None).await;
        assert_eq!(body["data"]["has_clocked_in"], true);
        assert_eq!(body["data"]["has_clocked_out"], true);
    }

    #[tokio::test]
    async fn history_filters_by_type_and_dates() {
        let app = test_app(CaretrackConfig::default());
        call(&app, Method::POST, "/api/attendance/clock-in", here()).await;
        app.clock.set(at(17, 0));
        call(&app, Method::POST, "/api/attendance/clock-out", here()).await;

        let (status, body) = call(
            &app,
            Method::GET,
            "/api/attendance/history?log_type=clock_in&start_date=2025-01-15&end_date=2025-01-15",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let logs = body["data"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["log_type"], "clock_in");

        let (_, body) = call(&app, Method::GET, "/api/attendance/history", None).await;
        let logs = body["data"].as_array().unwrap();
        assert_eq!(logs[0]["log_type"], "clock_out");
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn history_rejects_bad_parameters() {
        let app = test_app(CaretrackConfig::default());
        for uri in [
            "/api/attendance/history?log_type=lunch",
            "/api/attendance/history?start_date=2025-01-16&end_date=2025-01-15",
            "/api/attendance/history?end_date=soon",
        ] {
            let (status, _) = call(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }
}
