//! Command-line interface for SwarmRoute
//!
//! Provides argument parsing and subcommand definitions for the binary.
//! All rendering lives in `main`; the core never prints.

use crate::classify::Complexity;
use crate::config::Tier;
use clap::{Parser, Subcommand};

/// Multi-model router and consensus engine for OpenAI-compatible LLM backends
#[derive(Parser)]
#[command(name = "swarmroute")]
#[command(version)]
#[command(about = "Multi-model router and consensus engine for OpenAI-compatible LLM backends")]
#[command(
    long_about = "SwarmRoute routes prompts to tiered LLM backends by complexity, fans prompts \
    out to multiple models for consensus or ranked comparison, and optionally enriches prompts \
    with retrieved knowledge-store context. Configuration comes from SWARM_* environment variables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Single query with complexity-based auto-routing
    Query {
        prompt: String,
        /// Force a complexity tier instead of classifying the prompt
        #[arg(long)]
        tier: Option<Complexity>,
        /// Optional system message
        #[arg(long)]
        system: Option<String>,
    },
    /// Fan the prompt out to one model per tier and synthesize a merged answer
    Consensus { prompt: String },
    /// Call several models from one tier in parallel and rank the answers
    Swarm {
        prompt: String,
        #[arg(long, default_value = "fast")]
        tier: Tier,
        #[arg(long, default_value_t = 3)]
        max_models: usize,
        /// Per-call timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
        /// Race mode: return the first successful answer and cancel the rest
        #[arg(long)]
        first: bool,
    },
    /// Knowledge-enriched pipeline (retrieve, generate, store)
    Pipeline {
        prompt: String,
        #[arg(long)]
        enrich: bool,
        #[arg(long)]
        store: bool,
        /// Generate via multi-model consensus instead of auto-routing
        #[arg(long)]
        consensus: bool,
        #[arg(long)]
        tier: Option<Complexity>,
    },
    /// Probe all configured services and report up/down
    Health,
    /// Start the HTTP API server
    Serve {
        #[arg(long, default_value_t = 9000)]
        port: u16,
    },
    /// Run the stdio JSON-RPC tool bridge
    Bridge,
}
