//! Error types for SwarmRoute
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Completion call to {endpoint} failed for model {model}: {reason}")]
    CompletionFailed {
        model: String,
        endpoint: String,
        reason: String,
    },

    #[error("Request to {endpoint} timed out after {timeout_seconds} seconds")]
    EndpointTimeout {
        endpoint: String,
        timeout_seconds: u64,
    },

    #[error("All models exhausted for complexity {complexity}. Last error: {last_error}")]
    TierExhausted {
        complexity: String,
        last_error: String,
    },

    #[error("Consensus failed: {0}")]
    ConsensusFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::CompletionFailed { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::EndpointTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            Self::TierExhausted { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::ConsensusFailed(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_tier_exhausted_error_mentions_last_error() {
        let err = AppError::TierExhausted {
            complexity: "T2".to_string(),
            last_error: "connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("T2"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_validation_error_response_status() {
        let err = AppError::Validation("prompt is required".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_endpoint_timeout_response_status() {
        let err = AppError::EndpointTimeout {
            endpoint: "http://localhost:4000".to_string(),
            timeout_seconds: 30,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_tier_exhausted_response_status() {
        let err = AppError::TierExhausted {
            complexity: "T1".to_string(),
            last_error: "HTTP 503".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_consensus_failed_response_status() {
        let err = AppError::ConsensusFailed("all consensus models failed".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
