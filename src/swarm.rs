//! Parallel model calling and response ranking
//!
//! Dispatches a bounded batch of same-tier models fully concurrently, folds
//! timeouts and failures into per-call results instead of propagating them,
//! and orders completed responses by a quality heuristic. A race variant
//! returns the first success and aborts the rest.

use crate::client::{CompletionClient, Message};
use crate::config::{ModelEntry, SwarmConfig, Tier};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of models dispatched per swarm call.
pub const DEFAULT_MAX_MODELS: usize = 3;

/// Default per-call timeout for swarm dispatch, in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Content shorter than this scores a flat 0.1 on length.
const DEGENERATE_CONTENT_CHARS: usize = 50;

/// Round to two decimals for wire-facing latency fields.
pub(crate) fn round_elapsed(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// Outcome class of one dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ok,
    Timeout,
    Error,
}

/// Result of one dispatched model call. Created once, never mutated.
///
/// `content` is populated if and only if the status is `ok`.
#[derive(Debug, Clone, Serialize)]
pub struct CallResult {
    pub model: String,
    pub status: CallStatus,
    pub elapsed_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResult {
    pub fn ok(model: impl Into<String>, elapsed_s: f64, content: String, tokens: Option<u64>) -> Self {
        Self {
            model: model.into(),
            status: CallStatus::Ok,
            elapsed_s,
            content: Some(content),
            tokens,
            error: None,
        }
    }

    pub fn timed_out(model: impl Into<String>, elapsed_s: f64) -> Self {
        Self {
            model: model.into(),
            status: CallStatus::Timeout,
            elapsed_s,
            content: None,
            tokens: None,
            error: Some("call timed out".to_string()),
        }
    }

    pub fn failed(model: impl Into<String>, elapsed_s: f64, error: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            status: CallStatus::Error,
            elapsed_s,
            content: None,
            tokens: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CallStatus::Ok
    }

    /// Successful and carrying a non-empty answer.
    pub fn has_content(&self) -> bool {
        self.is_ok() && self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Call a single model with its own deadline, folding every failure mode into
/// the returned [`CallResult`].
pub async fn call_model(
    client: &CompletionClient,
    entry: &ModelEntry,
    messages: &[Message],
    timeout: Duration,
) -> CallResult {
    let started = Instant::now();
    let call = client.chat_completion(entry.model_id(), messages, entry.endpoint(), timeout);

    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(envelope)) => {
            let elapsed = round_elapsed(started.elapsed().as_secs_f64());
            let content = CompletionClient::extract_text(&envelope);
            let tokens = CompletionClient::total_tokens(&envelope);
            CallResult::ok(entry.model_id(), elapsed, content, tokens)
        }
        Ok(Err(AppError::EndpointTimeout { .. })) | Err(_) => {
            CallResult::timed_out(entry.model_id(), round_elapsed(started.elapsed().as_secs_f64()))
        }
        Ok(Err(e)) => CallResult::failed(
            entry.model_id(),
            round_elapsed(started.elapsed().as_secs_f64()),
            e.to_string(),
        ),
    }
}

/// Heuristic quality score for a completed result.
///
/// Length (capped, with a steep penalty for degenerate short answers) plus
/// structure markers (fenced code, headings) plus a speed bonus that decays
/// to zero at 30 seconds. Anything that is not a successful non-empty answer
/// scores -1 and sorts last.
pub fn score(result: &CallResult) -> f64 {
    if !result.has_content() {
        return -1.0;
    }
    let content = result.content.as_deref().unwrap_or_default();

    let chars = content.chars().count();
    let mut length_score = (chars as f64 / 500.0).min(3.0);
    if chars < DEGENERATE_CONTENT_CHARS {
        length_score = 0.1;
    }

    let mut structure_score = 0.0;
    if content.contains("```") {
        structure_score += 0.5;
    }
    if content.lines().any(|line| line.starts_with('#')) {
        structure_score += 0.3;
    }

    let speed_score = (1.0 - result.elapsed_s / 30.0).max(0.0);

    length_score + structure_score + speed_score
}

/// Sort results best-first by [`score`]. The sort is stable, so ties keep
/// their relative input order.
pub fn rank(results: Vec<CallResult>) -> Vec<CallResult> {
    let mut scored: Vec<(f64, CallResult)> =
        results.into_iter().map(|r| (score(&r), r)).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, r)| r).collect()
}

/// Concurrent same-tier fan-out caller.
#[derive(Debug, Clone)]
pub struct SwarmCaller {
    config: Arc<SwarmConfig>,
    client: CompletionClient,
}

impl SwarmCaller {
    pub fn new(config: Arc<SwarmConfig>, client: CompletionClient) -> Self {
        Self { config, client }
    }

    fn select(&self, tier: Tier, max_models: usize) -> Vec<ModelEntry> {
        self.config
            .tier_models(tier)
            .into_iter()
            .take(max_models)
            .cloned()
            .collect()
    }

    /// Call up to `max_models` from the chosen tier in parallel and return
    /// the results ranked best-first. Failures and timeouts are included,
    /// at the bottom of the ordering.
    pub async fn call(
        &self,
        prompt: &str,
        tier: Tier,
        max_models: usize,
        timeout: Duration,
    ) -> Vec<CallResult> {
        let selected = self.select(tier, max_models);
        tracing::debug!(tier = %tier, dispatched = selected.len(), "swarm dispatch");

        let messages = vec![Message::user(prompt)];
        let calls = selected
            .iter()
            .map(|entry| call_model(&self.client, entry, &messages, timeout));
        let results = futures::future::join_all(calls).await;
        rank(results)
    }

    /// Race mode: dispatch the same batch and return the first success,
    /// actively aborting every still-pending call. `None` means every
    /// candidate failed.
    pub async fn first(
        &self,
        prompt: &str,
        tier: Tier,
        max_models: usize,
        timeout: Duration,
    ) -> Option<CallResult> {
        let selected = self.select(tier, max_models);
        let messages = Arc::new(vec![Message::user(prompt)]);

        let mut tasks = tokio::task::JoinSet::new();
        for entry in selected {
            let client = self.client.clone();
            let messages = Arc::clone(&messages);
            tasks.spawn(async move { call_model(&client, &entry, &messages, timeout).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) if result.is_ok() => {
                    tracing::info!(model = %result.model, elapsed_s = result.elapsed_s, "race winner");
                    tasks.abort_all();
                    return Some(result);
                }
                Ok(result) => {
                    tracing::debug!(model = %result.model, status = ?result.status, "race candidate failed");
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    tracing::warn!(error = %e, "race task failed to join");
                }
            }
        }

        None
    }
}
