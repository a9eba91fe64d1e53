//! Stdio JSON-RPC tool bridge
//!
//! Exposes the router, swarm caller and health monitor as tools over
//! line-delimited JSON-RPC 2.0 on stdio, so any tool-protocol client can
//! drive them. Responses render as plain text; every tool failure comes back
//! as an `isError` result rather than a protocol error.

use crate::classify::Complexity;
use crate::client::CompletionClient;
use crate::config::{SwarmConfig, Tier};
use crate::error::{AppError, AppResult};
use crate::health::HealthMonitor;
use crate::router::AutoRouter;
use crate::swarm::{CallStatus, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_MAX_MODELS, SwarmCaller};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Protocol version answered to `initialize`.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Per-result content cap in the swarm rendering.
const SWARM_CONTENT_CLIP: usize = 2000;

/// Tool descriptors for `tools/list`.
fn tool_descriptors() -> Value {
    json!([
        {
            "name": "swarm_query",
            "description": "Route a query through the best AI model (auto-selected by complexity).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "prompt": {"type": "string", "description": "The query or task"},
                    "tier": {
                        "type": "string",
                        "enum": ["T1", "T2", "T3"],
                        "description": "Force a complexity tier (optional)"
                    }
                },
                "required": ["prompt"]
            }
        },
        {
            "name": "swarm_call",
            "description": "Call multiple AI models in parallel and rank the answers. Tiers: fast, power, deep.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "prompt": {"type": "string", "description": "The query or task"},
                    "tier": {"type": "string", "enum": ["fast", "power", "deep"], "default": "fast"},
                    "max_models": {"type": "integer", "default": 3}
                },
                "required": ["prompt"]
            }
        },
        {
            "name": "swarm_status",
            "description": "Check health of all connected AI services.",
            "inputSchema": {"type": "object", "properties": {}}
        }
    ])
}

/// Components the tool handlers run against.
struct BridgeState {
    router: AutoRouter,
    swarm: SwarmCaller,
    health: HealthMonitor,
}

impl BridgeState {
    fn new(config: Arc<SwarmConfig>) -> AppResult<Self> {
        let client = CompletionClient::new()?;
        Ok(Self {
            router: AutoRouter::new(config.clone(), client.clone()),
            swarm: SwarmCaller::new(config.clone(), client),
            health: HealthMonitor::for_config(&config)?,
        })
    }

    async fn tool_query(&self, arguments: &Value) -> String {
        let Some(prompt) = arguments.get("prompt").and_then(Value::as_str) else {
            return "Error: 'prompt' is required.".to_string();
        };
        let forced = arguments
            .get("tier")
            .and_then(Value::as_str)
            .and_then(|t| t.parse::<Complexity>().ok());

        match self.router.route(prompt, None, forced, None).await {
            Ok(outcome) => format!(
                "[Model: {} | Tier: {} | {}s]\n\n{}",
                outcome.model, outcome.tier, outcome.latency_s, outcome.response
            ),
            Err(e) => format!("Error: {e}"),
        }
    }

    async fn tool_swarm(&self, arguments: &Value) -> String {
        let Some(prompt) = arguments.get("prompt").and_then(Value::as_str) else {
            return "Error: 'prompt' is required.".to_string();
        };
        let tier = arguments
            .get("tier")
            .and_then(Value::as_str)
            .and_then(|t| t.parse::<Tier>().ok())
            .unwrap_or(Tier::Fast);
        let max_models = arguments
            .get("max_models")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_MODELS);

        let results = self
            .swarm
            .call(
                prompt,
                tier,
                max_models,
                Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            )
            .await;

        let mut parts = vec![format!("Swarm | tier={tier} | {} model(s)\n", results.len())];
        for (i, result) in results.iter().enumerate() {
            parts.push(format!(
                "\n[{}] {} | {:?} | {}s",
                i + 1,
                result.model,
                result.status,
                result.elapsed_s
            ));
            match (&result.status, &result.content, &result.error) {
                (CallStatus::Ok, Some(content), _) => {
                    parts.push(content.chars().take(SWARM_CONTENT_CLIP).collect());
                }
                (_, _, Some(error)) => parts.push(format!("Error: {error}")),
                _ => {}
            }
        }
        parts.join("\n")
    }

    async fn tool_status(&self) -> String {
        let snapshot = self.health.refresh().await;
        let mut lines = vec!["Service Status:".to_string()];
        let mut names: Vec<&String> = snapshot.keys().collect();
        names.sort();
        for name in names {
            let state = if snapshot[name] { "OK" } else { "FAIL" };
            lines.push(format!("  {name:<30} {state}"));
        }
        lines.join("\n")
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Option<String> {
        match name {
            "swarm_query" => Some(self.tool_query(arguments).await),
            "swarm_call" => Some(self.tool_swarm(arguments).await),
            "swarm_status" => Some(self.tool_status().await),
            _ => None,
        }
    }
}

/// Dispatch one JSON-RPC request. `None` means no response is due
/// (notifications).
async fn handle_request(request: &Value, state: &BridgeState) -> Option<Value> {
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let request_id = request.get("id").cloned().unwrap_or(Value::Null);

    if method == "initialize" {
        return Some(json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "result": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {
                    "name": "swarmroute-bridge",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }
        }));
    }

    if method.starts_with("notifications/") {
        return None;
    }

    if method == "tools/list" {
        return Some(json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "result": {"tools": tool_descriptors()},
        }));
    }

    if method == "tools/call" {
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
        let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let (text, is_error) = match state.call_tool(tool_name, &arguments).await {
            Some(text) => {
                let is_error = text.starts_with("Error:");
                (text, is_error)
            }
            None => (format!("Unknown tool: {tool_name}"), true),
        };

        return Some(json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "result": {
                "content": [{"type": "text", "text": text}],
                "isError": is_error,
            }
        }));
    }

    Some(json!({
        "jsonrpc": "2.0",
        "id": request_id,
        "error": {"code": -32601, "message": format!("Method not found: {method}")},
    }))
}

/// Run the bridge until stdin closes.
///
/// Unparsable lines are skipped; every valid request gets exactly one
/// response line.
pub async fn run(config: Arc<SwarmConfig>) -> AppResult<()> {
    let state = BridgeState::new(config)?;
    tracing::info!("bridge starting on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| AppError::Internal(format!("stdin read failed: {e}")))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(request) = serde_json::from_str::<Value>(line) else {
            tracing::debug!("skipping unparsable bridge input line");
            continue;
        };

        if let Some(response) = handle_request(&request, &state).await {
            let mut bytes = serde_json::to_vec(&response)
                .map_err(|e| AppError::Internal(format!("response serialization failed: {e}")))?;
            bytes.push(b'\n');
            stdout
                .write_all(&bytes)
                .await
                .map_err(|e| AppError::Internal(format!("stdout write failed: {e}")))?;
            stdout
                .flush()
                .await
                .map_err(|e| AppError::Internal(format!("stdout flush failed: {e}")))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> BridgeState {
        BridgeState::new(Arc::new(SwarmConfig::default())).expect("should build bridge state")
    }

    #[tokio::test]
    async fn test_initialize_reports_protocol_and_server_info() {
        let state = test_state();
        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});

        let response = handle_request(&request, &state).await.expect("response due");
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "swarmroute-bridge");
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let state = test_state();
        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});

        assert!(handle_request(&request, &state).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_names_all_tools() {
        let state = test_state();
        let request = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});

        let response = handle_request(&request, &state).await.expect("response due");
        let tools = response["result"]["tools"].as_array().expect("tools array");
        let names: Vec<&str> = tools
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names, vec!["swarm_query", "swarm_call", "swarm_status"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result_not_protocol_error() {
        let state = test_state();
        let request = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "nonexistent", "arguments": {}},
        });

        let response = handle_request(&request, &state).await.expect("response due");
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_unknown_method_is_method_not_found() {
        let state = test_state();
        let request = json!({"jsonrpc": "2.0", "id": 4, "method": "resources/list"});

        let response = handle_request(&request, &state).await.expect("response due");
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_query_tool_requires_prompt() {
        let state = test_state();
        let request = json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "swarm_query", "arguments": {}},
        });

        let response = handle_request(&request, &state).await.expect("response due");
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("'prompt' is required"));
    }
}
