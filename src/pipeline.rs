//! Knowledge-enriched pipeline
//!
//! Sequences context retrieval, prompt enrichment, answer generation (routed
//! or consensus) and best-effort result storage. Each step runs once and
//! either feeds the next or degrades: enrichment failures mean zero context,
//! storage runs detached and is only logged. Only generation failures reach
//! the caller.

use crate::classify::Complexity;
use crate::client::CompletionClient;
use crate::config::{SwarmConfig, Tier};
use crate::consensus::ConsensusEngine;
use crate::error::AppResult;
use crate::health::HealthMonitor;
use crate::knowledge::{self, KnowledgeClient};
use crate::router::AutoRouter;
use crate::swarm::round_elapsed;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Caller-selected pipeline behavior.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub enrich: bool,
    pub store: bool,
    pub use_consensus: bool,
    pub tier: Option<Complexity>,
}

/// Which generation path produced the answer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModelInfo {
    Routed { model: String, tier: Tier },
    Consensus { consensus: bool, model_count: usize },
}

impl ModelInfo {
    fn consensus(model_count: usize) -> Self {
        Self::Consensus {
            consensus: true,
            model_count,
        }
    }
}

/// Full pipeline result.
///
/// `stored` echoes the caller's request flag - storage is fire-and-forget
/// and its outcome is deliberately not part of this contract.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub answer: String,
    pub prompt_original: String,
    pub prompt_enriched: String,
    pub context_results_count: usize,
    pub model_info: ModelInfo,
    pub total_latency_s: f64,
    pub stored: bool,
}

/// Orchestrates retrieval, generation and storage over the shared config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    router: AutoRouter,
    consensus: ConsensusEngine,
    knowledge: Option<KnowledgeClient>,
}

impl Pipeline {
    pub fn new(config: Arc<SwarmConfig>, client: CompletionClient) -> AppResult<Self> {
        let knowledge = config
            .knowledge_url()
            .map(KnowledgeClient::new)
            .transpose()?;

        Ok(Self {
            router: AutoRouter::new(config.clone(), client.clone()),
            consensus: ConsensusEngine::new(config, client),
            knowledge,
        })
    }

    /// Run the full pipeline for one prompt.
    ///
    /// # Errors
    ///
    /// Only generation errors propagate (tier exhaustion or total consensus
    /// failure); retrieval and storage degrade silently.
    pub async fn run(
        &self,
        prompt: &str,
        options: &PipelineOptions,
        health: Option<&HealthMonitor>,
    ) -> AppResult<PipelineOutcome> {
        if let Some(monitor) = health {
            monitor.refresh().await;
        }

        // Step 1: retrieve context and enrich the prompt
        let mut context_results_count = 0;
        let mut enriched = prompt.to_string();
        if options.enrich {
            if let Some(store) = &self.knowledge {
                tracing::info!("searching knowledge store for context");
                let results = store.search(prompt).await;
                context_results_count = results.len();
                let context = KnowledgeClient::format_context(&results);
                if !context.is_empty() {
                    enriched = format!("{context}\n\nUSER QUESTION:\n{prompt}");
                    tracing::info!(
                        results = context_results_count,
                        "prompt enriched with retrieved context"
                    );
                }
            }
        }

        // Step 2: generate the answer
        let started = Instant::now();
        let (answer, model_info) = if options.use_consensus {
            let outcome = self.consensus.run(&enriched, None, None, health).await?;
            (outcome.merged, ModelInfo::consensus(outcome.model_count))
        } else {
            let outcome = self.router.route(&enriched, None, options.tier, health).await?;
            (
                outcome.response,
                ModelInfo::Routed {
                    model: outcome.model,
                    tier: outcome.tier,
                },
            )
        };
        let total_latency_s = round_elapsed(started.elapsed().as_secs_f64());

        // Step 3: store the exchange, detached; the pipeline never waits on it
        if options.store {
            if let Some(store) = &self.knowledge {
                let record = format!(
                    "Q: {prompt}\n\nA: {answer}\n\nGenerated by: {} at {}",
                    serde_json::to_string(&model_info)
                        .unwrap_or_else(|_| "{}".to_string()),
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                );
                let store = store.clone();
                tokio::spawn(async move {
                    if !store.add(&record, knowledge::DEFAULT_DATASET).await {
                        tracing::warn!("background knowledge store write failed");
                    }
                });
            }
        }

        Ok(PipelineOutcome {
            answer,
            prompt_original: prompt.to_string(),
            prompt_enriched: enriched,
            context_results_count,
            model_info,
            total_latency_s,
            stored: options.store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_info_routed_serialization() {
        let info = ModelInfo::Routed {
            model: "llama-8b".to_string(),
            tier: Tier::Fast,
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value, json!({"model": "llama-8b", "tier": "fast"}));
    }

    #[test]
    fn test_model_info_consensus_serialization() {
        let info = ModelInfo::consensus(2);
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value, json!({"consensus": true, "model_count": 2}));
    }

    #[test]
    fn test_pipeline_options_deserialize_defaults() {
        let options: PipelineOptions = serde_json::from_str("{}").unwrap();
        assert!(!options.enrich);
        assert!(!options.store);
        assert!(!options.use_consensus);
        assert!(options.tier.is_none());
    }

    #[test]
    fn test_pipeline_without_knowledge_url_has_no_store() {
        let config = Arc::new(SwarmConfig::default());
        let client = CompletionClient::new().expect("should build client");
        let pipeline = Pipeline::new(config, client).expect("should build pipeline");
        assert!(pipeline.knowledge.is_none());
    }
}
