//! Knowledge-store client
//!
//! Talks to a graph knowledge store (Cognee-compatible API): semantic search
//! for context retrieval and text ingestion for result storage. Every failure
//! here degrades instead of propagating - a missing or broken store must
//! never take the pipeline down with it.

use crate::config::CONNECT_TIMEOUT_SECS;
use crate::error::{AppError, AppResult};
use serde_json::Value;
use std::time::Duration;

/// Dataset name used for stored pipeline records.
pub const DEFAULT_DATASET: &str = "orchestrator";

/// Read timeout for search requests.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Read timeout for add requests.
const ADD_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of retrieved items rendered into a context block.
const CONTEXT_ITEMS: usize = 5;

/// Per-item character cap in the context block.
const CONTEXT_ITEM_CHARS: usize = 500;

/// HTTP client for the knowledge store's search/add API.
#[derive(Debug, Clone)]
pub struct KnowledgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl KnowledgeClient {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build knowledge client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Graph-completion search. Returns an empty list on any failure.
    ///
    /// The store answers either with a bare JSON array or with a
    /// `{"results": [...]}` envelope; anything else is wrapped as a single
    /// item.
    pub async fn search(&self, query: &str) -> Vec<Value> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "query": query,
            "query_type": "GRAPH_COMPLETION",
        });

        let attempt = async {
            self.http
                .post(&url)
                .timeout(SEARCH_TIMEOUT)
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        };

        match attempt.await {
            Ok(Value::Array(items)) => items,
            Ok(other) => match other.get("results") {
                Some(Value::Array(items)) => items.clone(),
                _ => vec![other],
            },
            Err(e) => {
                tracing::warn!(error = %e, "knowledge search failed");
                Vec::new()
            }
        }
    }

    /// Add a text record to the store. Returns whether the store accepted it;
    /// failures are logged, never raised.
    pub async fn add(&self, text: &str, dataset: &str) -> bool {
        let url = format!("{}/add", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "text": text,
            "dataset_name": dataset,
        });

        let attempt = async {
            self.http
                .post(&url)
                .timeout(ADD_TIMEOUT)
                .json(&body)
                .send()
                .await?
                .error_for_status()
        };

        match attempt.await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "knowledge add failed");
                false
            }
        }
    }

    /// Render retrieved items into a bounded context block for prompt
    /// enrichment. Empty input renders to an empty string.
    pub fn format_context(results: &[Value]) -> String {
        if results.is_empty() {
            return String::new();
        }

        let mut lines = vec!["RELEVANT KNOWLEDGE FROM MEMORY:".to_string()];
        for (i, item) in results.iter().take(CONTEXT_ITEMS).enumerate() {
            let text = match item {
                Value::String(s) => s.clone(),
                other => other
                    .get("text")
                    .or_else(|| other.get("content"))
                    .or_else(|| other.get("summary"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            };
            let clipped: String = text.chars().take(CONTEXT_ITEM_CHARS).collect();
            lines.push(format!("[{}] {}", i + 1, clipped));
        }
        lines.join("\n")
    }
}
