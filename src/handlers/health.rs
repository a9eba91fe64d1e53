//! Health check endpoint
//!
//! Probes all configured services and reports the aggregate.

use crate::handlers::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::collections::HashMap;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: HashMap<String, bool>,
}

/// GET /health handler
///
/// Refreshes the monitor and returns 200 with `ok` when every registered
/// service is up, `degraded` otherwise.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let services = state.health().refresh().await;
    let status = if services.values().all(|&up| up) {
        "ok"
    } else {
        "degraded"
    };

    (StatusCode::OK, Json(HealthResponse { status, services }))
}
