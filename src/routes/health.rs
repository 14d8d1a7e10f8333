use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub idle_connections: u32,
}

/// Liveness check. Reports the pool's idle count without checking out a
/// connection, so it stays cheap under load.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let pool_state = state.pool.state();
    let database = if pool_state.connections > 0 {
        "connected"
    } else {
        "idle"
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            database,
            idle_connections: pool_state.idle_connections,
        }),
    )
}
