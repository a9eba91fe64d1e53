//! Multi-model consensus endpoint

use crate::consensus::ConsensusOutcome;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use axum::{Extension, Json, extract::State};
use serde::Deserialize;

/// Consensus request from client
#[derive(Debug, Deserialize)]
pub struct ConsensusRequest {
    pub prompt: String,
    #[serde(default)]
    pub system: Option<String>,
}

/// POST /v1/consensus handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ConsensusRequest>,
) -> AppResult<Json<ConsensusOutcome>> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt is required".to_string()));
    }

    tracing::debug!(
        request_id = %request_id,
        prompt_length = request.prompt.len(),
        "Received consensus request"
    );

    let outcome = state
        .consensus()
        .run(
            &request.prompt,
            None,
            request.system.as_deref(),
            Some(state.health()),
        )
        .await?;

    Ok(Json(outcome))
}
