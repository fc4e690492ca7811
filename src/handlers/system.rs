// ---------------------------------------------------------------------------
// handlers/system.rs - liveness, health, readiness
// ---------------------------------------------------------------------------

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::models::{AliveResponse, HealthResponse};
use crate::state::AppState;

pub const APP_NAME: &str = "GMB Website Finder";

/// GET / - static liveness indicator. Touches no state.
#[utoipa::path(get, path = "/", tag = "health",
    responses((status = 200, description = "Service is alive", body = AliveResponse))
)]
pub async fn alive() -> Json<AliveResponse> {
    Json(AliveResponse {
        status: "Website resolver is alive".to_string(),
    })
}

#[utoipa::path(get, path = "/api/health", tag = "health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.is_ready() { "ok" } else { "starting" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        app: APP_NAME.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// GET /api/health/ready - lightweight readiness probe (no locks, no fetches).
#[utoipa::path(get, path = "/api/health/ready", tag = "health",
    responses(
        (status = 200, description = "Service ready", body = Value),
        (status = 503, description = "Service not ready", body = Value)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> axum::response::Response {
    let ready = state.is_ready();
    let uptime = state.start_time.elapsed().as_secs();
    let body = json!({ "ready": ready, "uptime_seconds": uptime });

    if ready {
        (StatusCode::OK, Json(body)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
