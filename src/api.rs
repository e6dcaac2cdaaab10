// PlayerDB - REST API with Axum
//
// `build_router` is the single entry point. Middleware (CORS, tracing) is
// attached by the server binary so tests can drive the bare router.

use crate::player::Player;
use crate::publisher::EventPublisher;
use crate::reconciliation::{BatchOutcome, Reconciler};
use crate::store::PlayerStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlayerStore>,
    pub publisher: Arc<dyn EventPublisher>,
    /// Snapshot read by POST /api/players/reload
    pub csv_path: PathBuf,
    pub rejection_channel: String,
}

// ============================================================================
// Response types
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub message: String,
    pub timestamp: i64,
}

impl ReloadResponse {
    fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: "CSV reloaded successfully".to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
    pub timestamp: i64,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().timestamp_millis(),
        }),
    )
        .into_response()
}

/// Query string for GET /api/players
#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Zero-based page index
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/players", get(list_players))
        .route(
            "/api/players/reload",
            get(get_player_named_reload).post(reload_players),
        )
        .route("/api/players/:player_id", get(get_player))
        .with_state(state)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/players?page=&size= - One page of players, ordered by key
async fn list_players(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    if params.size == 0 {
        return error_response(StatusCode::BAD_REQUEST, "Page size must not be less than one");
    }

    match state.store.find_page(params.page, params.size) {
        Ok(players) => (StatusCode::OK, Json(players)).into_response(),
        Err(e) => {
            error!(error = %e, "Error listing players");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list players")
        }
    }
}

/// GET /api/players/:player_id - One player by key
async fn get_player(State(state): State<AppState>, Path(player_id): Path<String>) -> Response {
    player_response(&state, &player_id)
}

/// GET /api/players/reload - The static reload route shadows the key "reload"
async fn get_player_named_reload(State(state): State<AppState>) -> Response {
    player_response(&state, "reload")
}

fn player_response(state: &AppState, player_id: &str) -> Response {
    match state.store.find_by_id(player_id) {
        Ok(Some(player)) => (StatusCode::OK, Json::<Player>(player)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Player {} not found", player_id),
        ),
        Err(e) => {
            error!(%player_id, error = %e, "Error loading player");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load player")
        }
    }
}

/// POST /api/players/reload - Run a full reconciliation, then answer
///
/// Always "success" once the batch returns; per-row detail goes to the logs
/// and the rejection channel.
async fn reload_players(State(state): State<AppState>) -> Response {
    let AppState {
        store,
        publisher,
        csv_path,
        rejection_channel,
    } = state;

    let result = tokio::task::spawn_blocking(move || {
        Reconciler::new(store.as_ref(), publisher.as_ref())
            .with_rejection_channel(rejection_channel)
            .reconcile_csv(&csv_path)
    })
    .await;

    match result {
        Ok(BatchOutcome::Completed(summary)) => {
            info!(summary = %summary.summary(), "Reload finished");
            (StatusCode::OK, Json(ReloadResponse::success())).into_response()
        }
        Ok(BatchOutcome::Aborted(reason)) => {
            warn!(%reason, "Reload aborted");
            (StatusCode::OK, Json(ReloadResponse::success())).into_response()
        }
        Err(e) => {
            error!(error = %e, "Reload task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "CSV reload failed")
        }
    }
}
