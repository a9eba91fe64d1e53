//! Chat-completion caller
//!
//! Owns a reqwest client and issues single chat-completion requests against
//! OpenAI-compatible endpoints. Retryable backend statuses (429 and the 5xx
//! gateway family) are retried with exponential backoff; connection errors,
//! timeouts and other 4xx surface immediately as call failures.
//!
//! The client is a component-owned resource: orchestration entry points
//! receive or construct their own instance, there is no ambient global
//! session.

use crate::config::{CONNECT_TIMEOUT_SECS, Endpoint};
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Backend statuses worth retrying at the transport layer.
const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Default number of retries after the initial attempt.
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base delay for exponential backoff.
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Sampling temperature sent with every completion request.
const TEMPERATURE: f64 = 0.7;

/// Generation cap sent with every completion request.
const MAX_TOKENS: u32 = 2048;

/// One chat message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    role: String,
    content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// HTTP caller for `POST {base}/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl CompletionClient {
    /// Build a client with the default retry policy (2 retries, 0.5s base).
    pub fn new() -> AppResult<Self> {
        Self::with_retry_policy(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF_BASE)
    }

    /// Build a client with an explicit retry policy.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the underlying HTTP client cannot be
    /// constructed (TLS backend initialization, resource exhaustion).
    pub fn with_retry_policy(max_retries: u32, backoff_base: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            max_retries,
            backoff_base,
        })
    }

    /// Issue one chat-completion request and return the raw response envelope.
    ///
    /// `read_timeout` bounds each attempt; retries get a fresh budget.
    ///
    /// # Errors
    ///
    /// - `AppError::EndpointTimeout` when an attempt exceeds `read_timeout`
    /// - `AppError::CompletionFailed` for connection failures, non-retryable
    ///   statuses, and retryable statuses that persist past the retry budget
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[Message],
        endpoint: &Endpoint,
        read_timeout: Duration,
    ) -> AppResult<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            endpoint.url().trim_end_matches('/')
        );
        let payload = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let mut attempt: u32 = 0;
        loop {
            let sent = self
                .http
                .post(&url)
                .bearer_auth(endpoint.api_key())
                .timeout(read_timeout)
                .json(&payload)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<Value>().await.map_err(|e| {
                            AppError::CompletionFailed {
                                model: model.to_string(),
                                endpoint: endpoint.url().to_string(),
                                reason: format!("invalid JSON body: {e}"),
                            }
                        });
                    }

                    if RETRYABLE_STATUS.contains(&status.as_u16()) && attempt < self.max_retries {
                        let delay = self.backoff_base * 2u32.pow(attempt);
                        tracing::warn!(
                            model = %model,
                            status = %status,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "retryable backend status, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(AppError::CompletionFailed {
                        model: model.to_string(),
                        endpoint: endpoint.url().to_string(),
                        reason: format!("HTTP {status}"),
                    });
                }
                Err(e) if e.is_timeout() => {
                    return Err(AppError::EndpointTimeout {
                        endpoint: endpoint.url().to_string(),
                        timeout_seconds: read_timeout.as_secs(),
                    });
                }
                Err(e) => {
                    return Err(AppError::CompletionFailed {
                        model: model.to_string(),
                        endpoint: endpoint.url().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Extract the answer text from a completion envelope.
    ///
    /// Reads `choices[0].message.content`; when the envelope shape is
    /// unexpected the whole envelope is stringified instead of failing.
    /// Backends vary enough that this degraded-extraction branch is kept
    /// deliberately.
    pub fn extract_text(envelope: &Value) -> String {
        match envelope
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
        {
            Some(text) => text.to_string(),
            None => {
                tracing::debug!("unexpected completion envelope shape, returning raw body");
                envelope.to_string()
            }
        }
    }

    /// Token usage reported by the backend, when present.
    pub fn total_tokens(envelope: &Value) -> Option<u64> {
        envelope.pointer("/usage/total_tokens").and_then(Value::as_u64)
    }
}
