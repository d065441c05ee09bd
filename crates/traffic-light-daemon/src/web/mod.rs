//! JSON control API.
//!
//! The browser sketch, a gesture classifier or any other client drives the
//! traffic light through these routes.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use traffic_light_hw::{Direction, Light, LightTimings, Mode};

use crate::state::{AppState, Status};

/// Errors returned to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Hardware(#[from] traffic_light_hw::Error),

    #[error("Request must name at least one mode")]
    NoMode,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Mode request body. Either a single mode or every label seen in a frame.
#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: Option<String>,
    #[serde(default)]
    modes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ModeResponse {
    mode: String,
    sent: bool,
}

/// Timings request body. Missing phases keep their current value.
#[derive(Debug, Deserialize)]
struct TimingsRequest {
    red: Option<u32>,
    yellow: Option<u32>,
    green: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct NudgeRequest {
    light: Light,
    direction: Direction,
}

#[derive(Debug, Serialize)]
struct NudgeResponse {
    applied: bool,
    timings: LightTimings,
}

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/state", get(status))
        .route("/api/mode", post(mode_set))
        .route("/api/timings", get(timings_get).post(timings_set))
        .route("/api/timings/nudge", post(timings_nudge))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/state - Device mirror, timings and link status
async fn status(State(state): State<Arc<AppState>>) -> Json<Status> {
    Json(state.status())
}

/// POST /api/mode - Debounced mode change
async fn mode_set(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<ModeResponse>, ApiError> {
    let modes = req
        .mode
        .iter()
        .chain(req.modes.iter())
        .map(|label| label.parse::<Mode>())
        .collect::<Result<Vec<_>, _>>()?;

    let (mode, sent) = state.request_modes(&modes).ok_or(ApiError::NoMode)?;
    Ok(Json(ModeResponse {
        mode: mode.to_string(),
        sent,
    }))
}

/// GET /api/timings - Current phase timings
async fn timings_get(State(state): State<Arc<AppState>>) -> Json<LightTimings> {
    Json(state.status().timings)
}

/// POST /api/timings - Slider commit
async fn timings_set(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TimingsRequest>,
) -> Json<LightTimings> {
    Json(state.update_timings(req.red, req.yellow, req.green))
}

/// POST /api/timings/nudge - Single-step adjustment from a gesture
async fn timings_nudge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NudgeRequest>,
) -> Json<NudgeResponse> {
    match state.nudge_timing(req.light, req.direction) {
        Some(timings) => Json(NudgeResponse {
            applied: true,
            timings,
        }),
        None => Json(NudgeResponse {
            applied: false,
            timings: state.status().timings,
        }),
    }
}
