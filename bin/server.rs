// Wage Dashboard - Web Server
// REST API with Axum: one figure session per browser, charts returned as JSON

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;
use wage_dashboard::config::MAX_SESSION_IDLE_MINUTES;
use wage_dashboard::{
    logging, ControlChange, Dashboard, DashboardConfig, DashboardError, DashboardSession,
    FigureEvent, SessionView,
};

type SessionMap = HashMap<Uuid, DashboardSession>;

/// Shared application state
#[derive(Clone)]
struct AppState {
    dashboard: Arc<Dashboard>,
    sessions: Arc<Mutex<SessionMap>>,
}

impl AppState {
    fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn sessions(&self) -> Result<MutexGuard<'_, SessionMap>, ApiError> {
        self.sessions.lock().map_err(|_| ApiError::LockPoisoned)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug)]
enum ApiError {
    Dashboard(DashboardError),
    SessionNotFound(Uuid),
    LockPoisoned,
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError::Dashboard(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Dashboard(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::SessionNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("session {} not found", id))
            }
            ApiError::LockPoisoned => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "session store unavailable".to_string(),
            ),
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Result of a control change: the event that drove the figures plus the new state
#[derive(Serialize)]
struct ControlResponse<'a> {
    event: FigureEvent,
    session: SessionView<'a>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/jobs - Job titles for the job selector
async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.dashboard.job_titles()))
}

/// GET /api/names/search?q= - Employee name lookup
async fn search_names(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    Json(ApiResponse::ok(state.dashboard.search_names(&params.q)))
}

/// POST /api/sessions - Open a session with the default selection
async fn create_session(State(state): State<AppState>) -> Result<Response, ApiError> {
    let session = state.dashboard.open_session()?;
    let mut sessions = state.sessions()?;
    evict_idle(&mut sessions, state.dashboard.config.server.session_idle_minutes);

    let response = (StatusCode::CREATED, Json(ApiResponse::ok(session.view()))).into_response();
    sessions.insert(session.id, session);
    Ok(response)
}

/// GET /api/sessions/:id - Current figures of a session
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let sessions = state.sessions()?;
    let session = sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(ApiResponse::ok(session.view())).into_response())
}

/// DELETE /api/sessions/:id - Drop a session and its figures
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let mut sessions = state.sessions()?;
    sessions.remove(&id).ok_or(ApiError::SessionNotFound(id))?;
    info!(session = %id, "closed session");
    Ok(Json(ApiResponse::ok(id)).into_response())
}

/// POST /api/sessions/:id/controls - Apply one control change
async fn apply_control(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(change): Json<ControlChange>,
) -> Result<Response, ApiError> {
    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;

    let event = session.apply(&state.dashboard, change).map_err(|err| {
        warn!(session = %id, error = %err, "rejected control change");
        ApiError::from(err)
    })?;

    Ok(Json(ApiResponse::ok(ControlResponse {
        event,
        session: session.view(),
    }))
    .into_response())
}

fn evict_idle(sessions: &mut SessionMap, idle_minutes: i64) {
    let now = Utc::now();
    let limit = Duration::minutes(idle_minutes.clamp(1, MAX_SESSION_IDLE_MINUTES));
    let before = sessions.len();
    sessions.retain(|_, session| session.idle_for(now) < limit);
    let evicted = before - sessions.len();
    if evicted > 0 {
        info!(evicted, remaining = sessions.len(), "evicted idle sessions");
    }
}

fn build_router(state: AppState) -> Router {
    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/jobs", get(list_jobs))
        .route("/names/search", get(search_names))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/controls", post(apply_control))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("info");

    println!("🌐 Wage Dashboard - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = DashboardConfig::load().context("Failed to load configuration")?;
    let bind = config.server.bind.clone();

    let dashboard = Dashboard::load(config)?;
    println!(
        "✓ Loaded {} jobs and {} names",
        dashboard.sources.jobs.entity_ids().len(),
        dashboard.sources.names.entity_ids().len()
    );

    let app = build_router(AppState::new(dashboard));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    println!("\n🚀 Server running on http://{}", bind);
    println!("   API: http://{}/api/sessions", bind);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wage_dashboard::{
        CompensationMetric, SourceKind, SourceRecord, SourceTable, SourceTables,
    };

    fn create_record(entity: &str, year: i32, pay: f64) -> SourceRecord {
        SourceRecord {
            entity_id: entity.to_string(),
            year,
            total_pay: Some(pay),
            total_pay_and_benefits: Some(pay * 1.2),
        }
    }

    fn create_test_state() -> AppState {
        let mut jobs = Vec::new();
        let mut names = Vec::new();
        for year in 2011..=2021 {
            let step = (year - 2011) as f64;
            jobs.push(create_record("Teaching Assistant", year, 400.0 + step * 5.0));
            jobs.push(create_record("Professor (II)", year, 1200.0 + step * 20.0));
            names.push(create_record("jane doe", year, 650.0 + step * 10.0));
        }
        let mut config = DashboardConfig::default();
        config.defaults.jobs = vec!["Teaching Assistant".to_string()];
        let sources = SourceTables {
            jobs: SourceTable::new(SourceKind::Jobs, CompensationMetric::ALL.to_vec(), jobs),
            names: SourceTable::new(SourceKind::Names, CompensationMetric::ALL.to_vec(), names),
        };
        AppState::new(Dashboard::new(config, sources))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn open(app: &Router) -> String {
        let (status, body) = send(app, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_and_jobs() {
        let app = build_router(create_test_state());

        let (status, body) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");

        let (_, body) = send(&app, "GET", "/api/jobs", None).await;
        assert_eq!(body["data"], json!(["Teaching Assistant", "Professor (II)"]));
    }

    #[tokio::test]
    async fn test_search_names() {
        let app = build_router(create_test_state());

        let (status, body) = send(&app, "GET", "/api/names/search?q=JANE", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outcome"], "matches");
        assert_eq!(body["data"]["names"][0]["name"], "jane doe");
    }

    #[tokio::test]
    async fn test_control_change_keeps_slots() {
        let app = build_router(create_test_state());
        let id = open(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/sessions/{}/controls", id),
            Some(json!({"control": "set_jobs", "value": ["Professor (II)"]})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["event"], json!({"kind": "data_changed"}));
        let ledger = &body["data"]["session"]["figures"]["real"]["ledger"]["entries"];
        assert_eq!(*ledger, json!({"Professor (II)": 1}));
    }

    #[tokio::test]
    async fn test_rejected_change_is_bad_request() {
        let app = build_router(create_test_state());
        let id = open(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/sessions/{}/controls", id),
            Some(json!({"control": "set_year_range", "value": {"min": 2019, "max": 2012}})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        // session untouched
        let (_, body) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
        assert_eq!(body["data"]["selection"]["years"], json!({"min": 2011, "max": 2021}));
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_sessions() {
        let app = build_router(create_test_state());
        let id = open(&app).await;

        let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_idle_sessions_evicted_on_create() {
        let state = create_test_state();
        let app = build_router(state.clone());
        let stale = open(&app).await;
        {
            let mut sessions = state.sessions.lock().unwrap();
            let session = sessions.get_mut(&stale.parse::<Uuid>().unwrap()).unwrap();
            session.last_active = Utc::now() - Duration::minutes(90);
        }

        let fresh = open(&app).await;

        let sessions = state.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&fresh.parse::<Uuid>().unwrap()));
    }

    #[test]
    fn test_evict_idle_clamps_timeout() {
        let state = create_test_state();
        let mut sessions = SessionMap::new();
        let session = state.dashboard.open_session().unwrap();
        sessions.insert(session.id, session);

        // out-of-range timeouts neither panic nor drop a fresh session
        evict_idle(&mut sessions, i64::MAX);
        evict_idle(&mut sessions, 0);
        assert_eq!(sessions.len(), 1);
    }
}
