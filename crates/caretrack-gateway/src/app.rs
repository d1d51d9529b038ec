use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use caretrack_auth::AuthService;
use caretrack_core::clock::{Calendar, Clock};
use caretrack_core::config::{CaretrackConfig, CorsConfig};
use caretrack_store::{
    AttendanceStore, AuthClientStore, CaregiverStore, RequestLogStore, ScheduleStore, TaskStore,
};
use caretrack_visits::VisitServices;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http;

/// Central shared state, passed as `Arc<AppState>` to every handler.
pub struct AppState {
    pub config: CaretrackConfig,
    pub visits: VisitServices,
    pub auth: AuthService,
    pub request_logs: Arc<dyn RequestLogStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new<S>(
        config: CaretrackConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> caretrack_core::Result<Self>
    where
        S: ScheduleStore
            + TaskStore
            + AttendanceStore
            + CaregiverStore
            + AuthClientStore
            + RequestLogStore
            + 'static,
    {
        let calendar = Calendar::new(clock.clone(), config.app.utc_offset()?);
        let auth = AuthService::new(
            store.clone(),
            store.clone(),
            clock.clone(),
            config.auth.clone(),
        );
        Ok(Self {
            visits: VisitServices::new(store.clone(), calendar),
            auth,
            request_logs: store,
            clock,
            config,
        })
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/token", post(http::auth::issue_token))
        .route("/schedules", get(http::schedules::list))
        .route("/schedules/today", get(http::schedules::today))
        .route("/schedules/metrics", get(http::schedules::metrics))
        .route("/schedules/{schedule_id}", get(http::schedules::get))
        .route("/schedules/{schedule_id}/start", post(http::schedules::start))
        .route("/schedules/{schedule_id}/end", post(http::schedules::end))
        .route("/schedules/{schedule_id}/tasks", post(http::tasks::create))
        .route("/tasks/{task_id}", patch(http::tasks::update_status))
        .route(
            "/admin/schedules/{schedule_id}/status",
            patch(http::schedules::set_status),
        )
        .route(
            "/attendance/today/status",
            get(http::attendance::today_status),
        )
        .route("/attendance/clock-in", post(http::attendance::clock_in))
        .route("/attendance/clock-out", post(http::attendance::clock_out))
        .route("/attendance/history", get(http::attendance::history));

    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/healthz", get(http::health::health_handler))
        .route("/docs", get(http::docs::swagger_ui))
        .route("/docs/openapi.yaml", get(http::docs::openapi_yaml))
        .nest("/api", api)
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            http::request_log::record,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = cfg
        .allow_methods
        .iter()
        .filter_map(|m| m.trim().to_ascii_uppercase().parse().ok())
        .collect();
    let headers: Vec<HeaderName> = cfg
        .allow_headers
        .iter()
        .filter_map(|h| h.trim().parse().ok())
        .collect();
    let expose: Vec<HeaderName> = cfg
        .expose_headers
        .iter()
        .filter_map(|h| h.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(expose)
        .allow_credentials(cfg.allow_credentials)
        .max_age(Duration::from_secs(cfg.max_age_secs));

    if cfg.allow_origins.iter().any(|o| o.trim() == "*") {
        // credentials cannot be combined with a literal wildcard origin
        return if cfg.allow_credentials {
            cors.allow_origin(AllowOrigin::mirror_request())
        } else {
            cors.allow_origin(Any)
        };
    }

    let origins: Vec<HeaderValue> = cfg
        .allow_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use caretrack_auth::TokenRequest;
    use caretrack_core::clock::FixedClock;
    use caretrack_core::types::{
        AuthClient, Caregiver, Client, Schedule, ScheduleStatus, Task, TaskStatus,
    };
    use caretrack_store::seed::sha256_hex;
    use caretrack_store::MemoryStore;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

    pub fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap()
    }

    pub struct TestApp {
        pub state: Arc<AppState>,
        pub store: Arc<MemoryStore>,
        pub clock: Arc<FixedClock>,
    }

    impl TestApp {
        pub fn router(&self) -> Router {
            build_router(self.state.clone())
        }

        pub async fn token(&self, client_id: &str) -> String {
            self.state
                .auth
                .issue_token(TokenRequest {
                    grant_type: "client_credentials".into(),
                    client_id: client_id.into(),
                    client_secret: "s3cret".into(),
                    scope: None,
                })
                .await
                .unwrap()
                .tokens
                .access_token
        }

        pub fn add_schedule(&self, id: &str, caregiver_id: &str, status: ScheduleStatus) {
            self.store
                .insert_schedule(Schedule {
                    id: id.into(),
                    caregiver_id: caregiver_id.into(),
                    client: Client {
                        id: "client-1".into(),
                        full_name: "Ada Client".into(),
                        ..Client::default()
                    },
                    service_name: "Personal care".into(),
                    location_label: "Home".into(),
                    start_time: at(10, 0),
                    end_time: at(10, 0) + ChronoDuration::minutes(60),
                    status,
                    clock_in: None,
                    clock_out: None,
                    notes: None,
                    created_at: at(0, 0),
                    updated_at: at(0, 0),
                    tasks: vec![Task {
                        id: format!("{id}-task"),
                        schedule_id: id.into(),
                        title: "Medication".into(),
                        description: String::new(),
                        status: TaskStatus::Pending,
                        not_completed_reason: None,
                        sort_order: 0,
                        updated_at: at(0, 0),
                    }],
                })
                .unwrap();
        }
    }

    fn client(id: &str, caregiver_id: &str, scopes: &[&str]) -> AuthClient {
        AuthClient {
            id: id.into(),
            secret_hash: sha256_hex("s3cret"),
            description: String::new(),
            caregiver_id: caregiver_id.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Two caregivers, a plain client for each and an admin client for cg-1.
    /// Clock at 2025-01-15T09:00:00Z.
    pub fn test_app(config: CaretrackConfig) -> TestApp {
        let store = Arc::new(MemoryStore::new());
        for (id, name) in [("cg-1", "Dana Carer"), ("cg-2", "Sam Carer")] {
            store
                .insert_caregiver(Caregiver {
                    id: id.into(),
                    name: name.into(),
                    email: format!("{id}@example.com"),
                })
                .unwrap();
        }
        store
            .insert_auth_client(client("app-1", "cg-1", &["schedules:read"]))
            .unwrap();
        store
            .insert_auth_client(client("app-2", "cg-2", &["schedules:read"]))
            .unwrap();
        store
            .insert_auth_client(client(
                "admin-1",
                "cg-1",
                &["schedules:read", caretrack_auth::ADMIN_SCOPE],
            ))
            .unwrap();

        let clock = Arc::new(FixedClock::new(at(9, 0)));
        let state = AppState::new(config, store.clone(), clock.clone()).unwrap();
        TestApp {
            state: Arc::new(state),
            store,
            clock,
        }
    }
}
