//! HTTP facade over the trigger store and shared status.
//!
//! Handlers never fail the listener: store errors become JSON error bodies,
//! and a trigger that cannot be read is reported as "no data" with 200.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use callboard_core::{has_data, now_secs, CallboardError, SharedStatus, TriggerStore};
use callboard_protocol::{
    CallRecord, ErrorBody, HealthResponse, StatusResponse, TestTriggerResponse, TriggerResponse,
    CLEAR_TRIGGER_PATH, HEALTH_PATH, STATUS_TEST_TRIGGER_SET, TEST_TRIGGER_PATH, TRIGGER_PATH,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TriggerStore>,
    pub status: Arc<SharedStatus>,
    pub test_trigger_name: Arc<str>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState, frontend_dir: &Path, media_dir: &Path) -> Router {
    let api = Router::new()
        .route(TRIGGER_PATH, get(get_trigger))
        .route(CLEAR_TRIGGER_PATH, post(clear_trigger))
        .route(TEST_TRIGGER_PATH, post(test_trigger))
        .route(HEALTH_PATH, get(health));

    Router::new()
        .route_service("/", ServeFile::new(frontend_dir.join("index.html")))
        .nest_service("/frontend", ServeDir::new(frontend_dir))
        .nest_service("/media", ServeDir::new(media_dir))
        .merge(api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<CallboardError> for ApiError {
    fn from(err: CallboardError) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Store task failed: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::new(self.message))).into_response()
    }
}

/// Runs blocking store IO off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> callboard_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(task).await??)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_trigger(State(state): State<AppState>) -> Json<TriggerResponse> {
    let AppState { store, status, .. } = state;
    let fallback_status = Arc::clone(&status);

    match tokio::task::spawn_blocking(move || trigger_snapshot(&store, &status)).await {
        Ok(response) => Json(response),
        Err(err) => {
            error!(error = %err, "Trigger read task failed; reporting no data");
            Json(TriggerResponse {
                trigger: None,
                timestamp: fallback_status.last_modified_secs(),
                has_data: false,
            })
        }
    }
}

/// Reads the store fresh and pairs it with the latest observation.
pub fn trigger_snapshot(store: &TriggerStore, status: &SharedStatus) -> TriggerResponse {
    let trigger = match store.read() {
        Ok(record) => record,
        Err(err) if err.is_malformed() => {
            warn!(error = %err, "Malformed trigger file; reporting no data");
            None
        }
        Err(err) => {
            error!(error = %err, "Failed to read trigger file; reporting no data");
            None
        }
    };
    let has_data = has_data(trigger.as_ref());

    TriggerResponse {
        trigger,
        timestamp: status.observed_secs(store),
        has_data,
    }
}

async fn clear_trigger(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let store = Arc::clone(&state.store);
    run_blocking(move || store.clear()).await.map_err(|err| {
        error!(error = %err.message, "Failed to clear trigger file");
        err
    })?;
    tracing::debug!("Trigger cleared");
    Ok(Json(StatusResponse::cleared()))
}

async fn test_trigger(
    State(state): State<AppState>,
) -> Result<Json<TestTriggerResponse>, ApiError> {
    let record = CallRecord::new(state.test_trigger_name.as_ref(), now_secs());
    let store = Arc::clone(&state.store);
    let written = record.clone();
    run_blocking(move || store.write(&written))
        .await
        .map_err(|err| {
            error!(error = %err.message, "Failed to write test trigger");
            err
        })?;
    info!(name = %record.name, timestamp = record.timestamp, "Test trigger set");

    Ok(Json(TestTriggerResponse {
        status: STATUS_TEST_TRIGGER_SET.to_string(),
        data: record,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        watch_mode: state.status.mode().as_str().to_string(),
        trigger_file: state.store.path().display().to_string(),
    })
}
