//! Knowledge-enriched pipeline endpoint

use crate::classify::Complexity;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::pipeline::{PipelineOptions, PipelineOutcome};
use axum::{Extension, Json, extract::State};
use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Pipeline request from client
///
/// Enrichment and storage default to on, matching the pipeline's intended
/// use; consensus is opt-in.
#[derive(Debug, Deserialize)]
pub struct PipelineRequest {
    pub prompt: String,
    #[serde(default = "default_true")]
    pub enrich: bool,
    #[serde(default = "default_true")]
    pub store: bool,
    #[serde(default)]
    pub consensus: bool,
    #[serde(default)]
    pub tier: Option<Complexity>,
}

/// POST /v1/pipeline handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<PipelineRequest>,
) -> AppResult<Json<PipelineOutcome>> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt is required".to_string()));
    }

    tracing::debug!(
        request_id = %request_id,
        enrich = request.enrich,
        store = request.store,
        consensus = request.consensus,
        "Received pipeline request"
    );

    let options = PipelineOptions {
        enrich: request.enrich,
        store: request.store,
        use_consensus: request.consensus,
        tier: request.tier,
    };

    let outcome = state
        .pipeline()
        .run(&request.prompt, &options, Some(state.health()))
        .await?;

    Ok(Json(outcome))
}
