//! HTTP request handlers for the SwarmRoute API
//!
//! Thin adapters over the core: every handler validates its request, calls
//! one orchestration entry point, and serializes the outcome as-is.

use crate::client::CompletionClient;
use crate::config::SwarmConfig;
use crate::consensus::ConsensusEngine;
use crate::error::AppResult;
use crate::health::HealthMonitor;
use crate::middleware::request_id_middleware;
use crate::pipeline::Pipeline;
use crate::router::AutoRouter;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod consensus;
pub mod health;
pub mod pipeline;
pub mod query;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<SwarmConfig>,
    router: Arc<AutoRouter>,
    consensus: Arc<ConsensusEngine>,
    pipeline: Arc<Pipeline>,
    health: Arc<HealthMonitor>,
}

impl AppState {
    /// Wire up the core components over one shared completion client.
    pub fn new(config: Arc<SwarmConfig>) -> AppResult<Self> {
        let client = CompletionClient::new()?;
        let health = Arc::new(HealthMonitor::for_config(&config)?);

        Ok(Self {
            router: Arc::new(AutoRouter::new(config.clone(), client.clone())),
            consensus: Arc::new(ConsensusEngine::new(config.clone(), client.clone())),
            pipeline: Arc::new(Pipeline::new(config.clone(), client)?),
            config,
            health,
        })
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn router(&self) -> &AutoRouter {
        &self.router
    }

    pub fn consensus(&self) -> &ConsensusEngine {
        &self.consensus
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }
}

/// Build the API router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/v1/query", post(query::handler))
        .route("/v1/consensus", post(consensus::handler))
        .route("/v1/pipeline", post(pipeline::handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appstate_new_creates_state() {
        let config = Arc::new(SwarmConfig::default());
        let state = AppState::new(config).expect("should create AppState");

        assert_eq!(state.config().primary().url(), "http://localhost:4000");
    }

    #[test]
    fn test_appstate_is_clonable() {
        let config = Arc::new(SwarmConfig::default());
        let state = AppState::new(config).expect("should create AppState");

        let state2 = state.clone();
        assert_eq!(state2.config().primary().name(), "primary");
    }
}
