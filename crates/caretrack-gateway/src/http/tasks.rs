use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use caretrack_core::types::{TaskDraft, TaskStatus};
use caretrack_core::CareError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::dto::ScheduleResponse;
use crate::http::error::ApiResult;
use crate::http::extract::{Caller, ValidJson};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub schedule_id: String,
    #[serde(default)]
    pub status: String,
    pub reason: Option<String>,
}

/// POST /api/schedules/{schedule_id}/tasks
pub async fn create(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(schedule_id): Path<String>,
    ValidJson(req): ValidJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let draft = TaskDraft {
        schedule_id: schedule_id.clone(),
        title: req.title,
        description: req.description,
        status: TaskStatus::Pending,
        sort_order: req.sort_order,
    };
    let task_id = state
        .visits
        .tasks
        .add_task(&caller.caregiver_id, &schedule_id, draft)
        .await?;
    let schedule = state
        .visits
        .schedules
        .get(&schedule_id, &caller.caregiver_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": ScheduleResponse::from(&schedule), "task_id": task_id })),
    ))
}

/// PATCH /api/tasks/{task_id}
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(task_id): Path<String>,
    ValidJson(req): ValidJson<UpdateTaskRequest>,
) -> ApiResult<Json<Value>> {
    if req.schedule_id.trim().is_empty() {
        return Err(CareError::validation("schedule_id is required").into());
    }
    let schedule = state
        .visits
        .tasks
        .update_status(
            &caller.caregiver_id,
            &req.schedule_id,
            &task_id,
            &req.status,
            req.reason.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "data": ScheduleResponse::from(&schedule) })))
}

#[cfg(test)]
mod tests {
    use crate::app::testing::{test_app, TestApp};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use caretrack_core::config::CaretrackConfig;
    use caretrack_core::types::ScheduleStatus;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send_json(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.router().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn create_returns_201_with_task_id() {
        let app = test_app(CaretrackConfig::default());
        app.add_schedule("s-1", "cg-1", ScheduleStatus::Scheduled);
        let token = app.token("app-1").await;

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/schedules/s-1/tasks",
            &token,
            json!({"title": "Evening walk", "sort_order": 3}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let task_id = body["task_id"].as_str().unwrap();
        let tasks = body["data"]["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        let added = tasks.iter().find(|t| t["id"] == task_id).unwrap();
        assert_eq!(added["status"], "pending");
        assert_eq!(added["title"], "Evening walk");
    }

    #[tokio::test]
    async fn create_without_title_is_400() {
        let app = test_app(CaretrackConfig::default());
        app.add_schedule("s-1", "cg-1", ScheduleStatus::Scheduled);
        let token = app.token("app-1").await;
        let (status, _) = send_json(
            &app,
            Method::POST,
            "/api/schedules/s-1/tasks",
            &token,
            json!({"description": "no title"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_status_round_trip() {
        let app = test_app(CaretrackConfig::default());
        app.add_schedule("s-1", "cg-1", ScheduleStatus::InProgress);
        let token = app.token("app-1").await;

        let (status, _) = send_json(
            &app,
            Method::PATCH,
            "/api/tasks/s-1-task",
            &token,
            json!({"schedule_id": "s-1", "status": "not_completed"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(
            &app,
            Method::PATCH,
            "/api/tasks/s-1-task",
            &token,
            json!({"schedule_id": "s-1", "status": "not_completed", "reason": "Client asleep"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tasks"][0]["status"], "not_completed");
        assert_eq!(body["data"]["tasks"][0]["not_completed_reason"], "Client asleep");
    }

    #[tokio::test]
    async fn task_on_other_schedule_is_403() {
        let app = test_app(CaretrackConfig::default());
        app.add_schedule("s-1", "cg-1", ScheduleStatus::InProgress);
        app.add_schedule("s-2", "cg-1", ScheduleStatus::InProgress);
        let token = app.token("app-1").await;

        let (status, body) = send_json(
            &app,
            Method::PATCH,
            "/api/tasks/s-2-task",
            &token,
            json!({"schedule_id": "s-1", "status": "completed"}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn missing_schedule_id_is_400() {
        let app = test_app(CaretrackConfig::default());
        let token = app.token("app-1").await;
        let (status, _) = send_json(
            &app,
            Method::PATCH,
            "/api/tasks/t-1",
            &token,
            json!({"status": "completed"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
