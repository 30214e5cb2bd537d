//! Liveness endpoint

use super::AppState;
use crate::config::AppEnvironment;
use axum::{extract::State, response::Json};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub environment: AppEnvironment,
}

/// Reports the process only; upstream feeds are not contacted here
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        environment: state.config.environment,
    })
}
