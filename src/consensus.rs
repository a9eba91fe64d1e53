//! Multi-model consensus
//!
//! Sends one prompt to several models concurrently through a bounded worker
//! pool, collects whatever completes before the shared deadline, and
//! synthesizes a single merged answer by routing a synthesis prompt through
//! the power-tier fallback chain. If that secondary call fails the merged
//! answer degrades to a labelled concatenation; synthesis failure never
//! reaches the caller.

use crate::classify::Complexity;
use crate::client::{CompletionClient, Message};
use crate::config::{ModelEntry, SwarmConfig, Tier};
use crate::error::{AppError, AppResult};
use crate::health::HealthMonitor;
use crate::router::AutoRouter;
use crate::swarm::{CallResult, call_model};
use futures::stream::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default worker-pool size for concurrent dispatch.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Default per-call timeout, in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 90;

/// Grace added to the call timeout before collection gives up on stragglers.
const COLLECTION_GRACE: Duration = Duration::from_secs(10);

/// A merged answer plus the per-model results (failures included).
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusOutcome {
    pub merged: String,
    pub individual: Vec<CallResult>,
    pub model_count: usize,
}

/// Concurrent multi-model dispatcher with answer synthesis.
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    config: Arc<SwarmConfig>,
    client: CompletionClient,
    max_workers: usize,
    call_timeout: Duration,
}

impl ConsensusEngine {
    pub fn new(config: Arc<SwarmConfig>, client: CompletionClient) -> Self {
        Self {
            config,
            client,
            max_workers: DEFAULT_MAX_WORKERS,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    /// Override the worker-pool size and per-call timeout.
    pub fn with_limits(mut self, max_workers: usize, call_timeout: Duration) -> Self {
        self.max_workers = max_workers.max(1);
        self.call_timeout = call_timeout;
        self
    }

    /// Default panel: the first registered model of each tier, skipping tiers
    /// with no registrations. At most three candidates.
    fn default_panel(&self) -> Vec<ModelEntry> {
        Tier::ALL
            .iter()
            .filter_map(|&tier| {
                self.config
                    .tier_models(tier)
                    .first()
                    .map(|entry| (*entry).clone())
            })
            .collect()
    }

    /// Dispatch the prompt to every selected model and synthesize a merged
    /// answer from the successful subset.
    ///
    /// Calls still outstanding when `call_timeout + 10s` lapses are abandoned
    /// and simply absent from the per-model list.
    ///
    /// # Errors
    ///
    /// `AppError::ConsensusFailed` when zero calls succeed.
    pub async fn run(
        &self,
        prompt: &str,
        models: Option<Vec<ModelEntry>>,
        system: Option<&str>,
        health: Option<&HealthMonitor>,
    ) -> AppResult<ConsensusOutcome> {
        if let Some(monitor) = health {
            monitor.refresh().await;
        }

        let selected = models.unwrap_or_else(|| self.default_panel());
        tracing::debug!(dispatched = selected.len(), "consensus dispatch");

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        let deadline = tokio::time::Instant::now() + self.call_timeout + COLLECTION_GRACE;

        let messages_ref = &messages;
        let client = &self.client;
        let config = &self.config;
        let mut calls = futures::stream::iter(selected.into_iter().map(|entry| async move {
            if let Some(monitor) = health {
                if !monitor.is_up(entry.endpoint().name()).await {
                    return CallResult::failed(
                        entry.model_id(),
                        0.0,
                        format!("{} unavailable", entry.endpoint().name()),
                    );
                }
            }
            let timeout = config.tier_timeout(entry.tier()).read();
            call_model(client, &entry, messages_ref, timeout).await
        }))
        .buffer_unordered(self.max_workers);

        let mut individual = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, calls.next()).await {
                Ok(Some(result)) => individual.push(result),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        collected = individual.len(),
                        "consensus collection deadline lapsed, abandoning stragglers"
                    );
                    break;
                }
            }
        }

        let successful: Vec<&CallResult> =
            individual.iter().filter(|r| r.has_content()).collect();
        if successful.is_empty() {
            return Err(AppError::ConsensusFailed(
                "all consensus models failed".to_string(),
            ));
        }

        let synthesis_prompt = build_synthesis_prompt(prompt, &successful);
        let router = AutoRouter::new(self.config.clone(), self.client.clone());
        let merged = match router
            .route(&synthesis_prompt, None, Some(Complexity::T2), health)
            .await
        {
            Ok(outcome) => outcome.response,
            Err(e) => {
                tracing::warn!(error = %e, "synthesis routing failed, falling back to concatenation");
                successful
                    .iter()
                    .map(|r| format!("[{}]\n{}", r.model, r.content.as_deref().unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join("\n\n---\n\n")
            }
        };

        let model_count = successful.len();
        Ok(ConsensusOutcome {
            merged,
            individual,
            model_count,
        })
    }
}

/// Build the synthesis prompt embedding the question and every successful
/// answer, numbered and labelled by model.
fn build_synthesis_prompt(prompt: &str, successful: &[&CallResult]) -> String {
    let mut text = String::from(
        "You are a synthesis agent. Multiple AI models answered the same question.\n\
        Combine their insights into a single, comprehensive, non-redundant answer.\n\n",
    );
    text.push_str(&format!("ORIGINAL QUESTION:\n{prompt}\n\nMODEL RESPONSES:\n"));
    for (i, result) in successful.iter().enumerate() {
        text.push_str(&format!(
            "\n--- Model {}: {} ---\n{}\n",
            i + 1,
            result.model,
            result.content.as_deref().unwrap_or_default()
        ));
    }
    text.push_str("\nSYNTHESIZED ANSWER:");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_result(model: &str, content: &str) -> CallResult {
        CallResult::ok(model, 1.0, content.to_string(), None)
    }

    #[test]
    fn test_synthesis_prompt_embeds_question_and_answers() {
        let a = ok_result("model-a", "Answer A");
        let c = ok_result("model-c", "Answer C");
        let successful = vec![&a, &c];

        let prompt = build_synthesis_prompt("What is Rust?", &successful);
        assert!(prompt.contains("ORIGINAL QUESTION:\nWhat is Rust?"));
        assert!(prompt.contains("--- Model 1: model-a ---\nAnswer A"));
        assert!(prompt.contains("--- Model 2: model-c ---\nAnswer C"));
        assert!(prompt.ends_with("SYNTHESIZED ANSWER:"));
    }

    #[test]
    fn test_default_panel_takes_first_of_each_tier() {
        let mut config = SwarmConfig::default();
        config
            .add_model("fast-1", Tier::Fast, None, 3.0)
            .add_model("fast-2", Tier::Fast, None, 3.0)
            .add_model("deep-1", Tier::Deep, None, 20.0);
        let client = CompletionClient::new().expect("should build client");
        let engine = ConsensusEngine::new(Arc::new(config), client);

        let panel = engine.default_panel();
        let ids: Vec<&str> = panel.iter().map(|m| m.model_id()).collect();
        // Power tier is empty and skipped; registration order decides the rest
        assert_eq!(ids, vec!["fast-1", "deep-1"]);
    }

    #[tokio::test]
    async fn test_empty_panel_fails_as_all_failed() {
        let client = CompletionClient::new().expect("should build client");
        let engine = ConsensusEngine::new(Arc::new(SwarmConfig::default()), client);

        let err = engine
            .run("anything", None, None, None)
            .await
            .expect_err("no registered models");
        assert!(matches!(err, AppError::ConsensusFailed(_)));
    }
}
