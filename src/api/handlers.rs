use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, WatchedFile};
use crate::storage::{MonitorState, StateStore};

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub config: Arc<Config>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: String,
    pub files: usize,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.store.name().to_string(),
        files: state.config.file_count(),
    })
}

// ============================================================================
// File State
// ============================================================================

#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileStatus>,
}

#[derive(Serialize)]
pub struct FileStatus {
    pub service: String,
    pub path: String,
    pub delay: u64,
    pub alerting: bool,
    /// `None` until the file has been polled once
    pub state: Option<MonitorState>,
}

fn file_statuses<'a>(
    store: &dyn StateStore,
    files: impl Iterator<Item = (&'a str, &'a WatchedFile)>,
) -> Result<Vec<FileStatus>, ApiError> {
    files
        .map(|(service, file)| {
            let state = store
                .get(&file.path)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(FileStatus {
                service: service.to_string(),
                path: file.path.clone(),
                delay: file.delay,
                alerting: state.as_ref().map_or(false, MonitorState::is_alerting),
                state,
            })
        })
        .collect()
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilesResponse>, ApiError> {
    let files = file_statuses(state.store.as_ref(), state.config.files())?;
    Ok(Json(FilesResponse { files }))
}

pub async fn service_files(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<FilesResponse>, ApiError> {
    let service = state
        .config
        .observed
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ApiError::NotFound(format!("Service '{}' not found", name)))?;

    let files = file_statuses(
        state.store.as_ref(),
        service.files.iter().map(|f| (service.name.as_str(), f)),
    )?;
    Ok(Json(FilesResponse { files }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
