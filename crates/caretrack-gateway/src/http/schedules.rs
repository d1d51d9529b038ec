use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use caretrack_auth::ADMIN_SCOPE;
use caretrack_core::types::VisitEvent;
use caretrack_core::CareError;
use caretrack_visits::ScheduleFilter;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::app::AppState;
use crate::http::dto::{
    page_limit, parse_optional_date, parse_statuses, ClockRequest, Pagination, ScheduleResponse,
};
use crate::http::error::ApiResult;
use crate::http::extract::{Caller, ValidJson, ValidQuery};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateParams {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

/// GET /api/schedules
pub async fn list(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidQuery(params): ValidQuery<ListParams>,
) -> ApiResult<Json<Value>> {
    let limit = page_limit(params.limit);
    let offset = params.offset.unwrap_or(0);
    let filter = ScheduleFilter {
        statuses: parse_statuses(params.status.as_deref().unwrap_or_default())?,
        date: parse_optional_date("date", params.date.as_deref())?,
        // one extra row tells us whether another page exists
        limit: limit + 1,
        offset,
    };

    let mut summaries = state
        .visits
        .schedules
        .list(&caller.caregiver_id, &filter)
        .await?;
    let has_more = summaries.len() > limit as usize;
    summaries.truncate(limit as usize);

    Ok(Json(json!({
        "data": summaries,
        "pagination": Pagination { limit, offset, has_more },
    })))
}

/// GET /api/schedules/today
pub async fn today(State(state): State<Arc<AppState>>, caller: Caller) -> ApiResult<Json<Value>> {
    let schedules = &state.visits.schedules;
    let summaries = schedules.today(&caller.caregiver_id).await?;
    let metrics = schedules.metrics(&caller.caregiver_id, None).await?;
    Ok(Json(json!({ "data": summaries, "metrics": metrics })))
}

/// GET /api/schedules/metrics
pub async fn metrics(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidQuery(params): ValidQuery<DateParams>,
) -> ApiResult<Json<Value>> {
    let date = parse_optional_date("date", params.date.as_deref())?;
    let metrics = state
        .visits
        .schedules
        .metrics(&caller.caregiver_id, date)
        .await?;
    Ok(Json(json!({ "data": metrics })))
}

/// GET /api/schedules/{schedule_id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(schedule_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let schedule = state
        .visits
        .schedules
        .get(&schedule_id, &caller.caregiver_id)
        .await?;
    Ok(Json(json!({ "data": ScheduleResponse::from(&schedule) })))
}

/// POST /api/schedules/{schedule_id}/start
pub async fn start(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(schedule_id): Path<String>,
    ValidJson(req): ValidJson<ClockRequest>,
) -> ApiResult<Json<Value>> {
    let event = visit_event(req)?;
    let schedule = state
        .visits
        .schedules
        .start(&schedule_id, &caller.caregiver_id, event)
        .await?;
    Ok(Json(json!({ "data": ScheduleResponse::from(&schedule) })))
}

/// POST /api/schedules/{schedule_id}/end
pub async fn end(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(schedule_id): Path<String>,
    ValidJson(req): ValidJson<ClockRequest>,
) -> ApiResult<Json<Value>> {
    let event = visit_event(req)?;
    let schedule = state
        .visits
        .schedules
        .end(&schedule_id, &caller.caregiver_id, event)
        .await?;
    Ok(Json(json!({ "data": ScheduleResponse::from(&schedule) })))
}

/// PATCH /api/admin/schedules/{schedule_id}/status
///
/// Bypasses the state machine; restricted to tokens carrying the admin scope.
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(schedule_id): Path<String>,
    ValidJson(req): ValidJson<StatusRequest>,
) -> ApiResult<Json<Value>> {
    if !caller.claims.has_scope(ADMIN_SCOPE) {
        warn!(caregiver_id = %caller.caregiver_id, "admin status override without scope");
        return Err(CareError::Forbidden.into());
    }
    let schedule = state
        .visits
        .schedules
        .set_status(&schedule_id, &req.status)
        .await?;
    Ok(Json(json!({ "data": ScheduleResponse::from(&schedule) })))
}

fn visit_event(req: ClockRequest) -> Result<VisitEvent, CareError> {
    Ok(VisitEvent {
        point: req.point()?,
        at: None,
        notes: req.notes,
    })
}
