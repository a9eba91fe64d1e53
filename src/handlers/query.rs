//! Auto-routed query endpoint

use crate::classify::Complexity;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::router::RouteOutcome;
use axum::{Extension, Json, extract::State};
use serde::Deserialize;

/// Query request from client
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub tier: Option<Complexity>,
}

/// POST /v1/query handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<QueryRequest>,
) -> AppResult<Json<RouteOutcome>> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt is required".to_string()));
    }

    tracing::debug!(
        request_id = %request_id,
        prompt_length = request.prompt.len(),
        forced_tier = ?request.tier,
        "Received query request"
    );

    let outcome = state
        .router()
        .route(
            &request.prompt,
            request.system.as_deref(),
            request.tier,
            Some(state.health()),
        )
        .await?;

    Ok(Json(outcome))
}
