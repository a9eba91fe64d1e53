//! Complexity-based auto-routing
//!
//! Routes a prompt to the best available model for its complexity tier,
//! falling back through tiers when the preferred one is unavailable. The walk
//! is a greedy, first-success, priority-ordered search: candidates within a
//! tier are tried strictly in registration order, sequentially, so cost stays
//! predictable and the first working model wins.

use crate::classify::{Complexity, classify};
use crate::client::{CompletionClient, Message};
use crate::config::{SwarmConfig, Tier};
use crate::error::{AppError, AppResult};
use crate::health::HealthMonitor;
use crate::swarm::round_elapsed;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of one routed completion.
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub model: String,
    pub tier: Tier,
    pub response: String,
    pub latency_s: f64,
}

/// First-success fallback router over the registered model tiers.
#[derive(Debug, Clone)]
pub struct AutoRouter {
    config: Arc<SwarmConfig>,
    client: CompletionClient,
}

impl AutoRouter {
    pub fn new(config: Arc<SwarmConfig>, client: CompletionClient) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &Arc<SwarmConfig> {
        &self.config
    }

    /// Route a prompt to the best available model.
    ///
    /// When `forced` is given it overrides classification. A supplied health
    /// monitor is refreshed synchronously first; models whose endpoint it
    /// reports down are skipped without a call attempt.
    ///
    /// # Errors
    ///
    /// `AppError::TierExhausted` when every candidate across the fallback
    /// chain failed or was skipped, carrying the last observed error.
    pub async fn route(
        &self,
        prompt: &str,
        system: Option<&str>,
        forced: Option<Complexity>,
        health: Option<&HealthMonitor>,
    ) -> AppResult<RouteOutcome> {
        if let Some(monitor) = health {
            monitor.refresh().await;
        }

        let complexity = forced.unwrap_or_else(|| classify(prompt, &self.config));

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        let mut last_error: Option<AppError> = None;

        for &tier in complexity.search_order() {
            let timeout = self.config.tier_timeout(tier);
            for entry in self.config.tier_models(tier) {
                if let Some(monitor) = health {
                    if !monitor.is_up(entry.endpoint().name()).await {
                        tracing::debug!(
                            model = %entry.model_id(),
                            endpoint = %entry.endpoint().name(),
                            "skipping model, endpoint is down"
                        );
                        continue;
                    }
                }

                let started = Instant::now();
                match self
                    .client
                    .chat_completion(entry.model_id(), &messages, entry.endpoint(), timeout.read())
                    .await
                {
                    Ok(envelope) => {
                        let latency = started.elapsed().as_secs_f64();
                        let response = CompletionClient::extract_text(&envelope);
                        tracing::info!(
                            model = %entry.model_id(),
                            tier = %tier,
                            latency_s = round_elapsed(latency),
                            "auto-route completed"
                        );
                        return Ok(RouteOutcome {
                            model: entry.model_id().to_string(),
                            tier,
                            response,
                            latency_s: round_elapsed(latency),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            model = %entry.model_id(),
                            tier = %tier,
                            error = %e,
                            "model call failed, trying next candidate"
                        );
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(AppError::TierExhausted {
            complexity: complexity.to_string(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidates attempted".to_string()),
        })
    }
}
