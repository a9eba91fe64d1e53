//! SwarmRoute - multi-model routing and consensus for OpenAI-compatible LLM backends
//!
//! This library classifies prompt complexity, routes prompts through tiered
//! fallback chains of registered models, fans prompts out to several models
//! concurrently (ranked swarm calls, racing, consensus with synthesis), and
//! runs knowledge-enriched pipelines against an external graph store.

pub mod bridge;
pub mod classify;
pub mod cli;
pub mod client;
pub mod config;
pub mod consensus;
pub mod error;
pub mod handlers;
pub mod health;
pub mod knowledge;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod swarm;
pub mod telemetry;
