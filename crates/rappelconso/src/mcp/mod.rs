mod cli;
mod prompts;
mod sse;
mod stdio;
mod tools;

pub use cli::App;

use crate::prelude::*;
use crate::recalls::{RecallClient, RecallConfig};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    #[serde(default, deserialize_with = "present")]
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

/// Keeps `"id": null` apart from a missing id, which marks a notification
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn new(id: Option<serde_json::Value>, result: Result<serde_json::Value, JsonRpcError>) -> Self {
        let (result, error) = match result {
            Ok(value) => (Some(value), None),
            Err(error) => (None, Some(error)),
        };

        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn invalid_params(message: impl std::fmt::Display) -> Self {
        Self {
            code: -32602,
            message: format!("Invalid params: {message}"),
            data: None,
        }
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self {
            code: -32603,
            message: format!("Internal error: {message}"),
            data: None,
        }
    }
}

// MCP Protocol types
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

/// Everything a request handler needs, shared by both transports
#[derive(Debug, Clone)]
pub struct ServerState {
    pub global: crate::Global,
    pub client: RecallClient,
}

impl ServerState {
    pub fn new(global: crate::Global) -> Result<Self> {
        let client = RecallClient::new(&RecallConfig::from_global(&global))?;
        Ok(Self { global, client })
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let state = ServerState::new(global)?;

    match app.command {
        cli::Commands::Stdio => stdio::run_stdio(state).await,
        cli::Commands::Sse(options) => sse::run_sse(options, state).await,
    }
}

/// Handle one JSON-RPC message; notifications yield `None`
pub async fn handle_request(request_str: &str, state: &ServerState) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return Some(JsonRpcResponse::new(
                None,
                Err(JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {e}"),
                    data: None,
                }),
            ));
        }
    };

    if request.id.is_none() {
        log::debug!("Notification: {}", request.method);
        return None;
    }

    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::new(
            request.id,
            Err(JsonRpcError {
                code: -32600,
                message: format!("Invalid request: unsupported jsonrpc {:?}", request.jsonrpc),
                data: None,
            }),
        ));
    }

    log::debug!("Request: {}", request.method);

    let result = match request.method.as_str() {
        "initialize" => tools::handle_initialize(),
        "ping" => Ok(serde_json::json!({})),
        "tools/list" => tools::handle_tools_list(),
        "tools/call" => tools::handle_tools_call(request.params, state).await,
        "prompts/list" => prompts::handle_prompts_list(),
        "prompts/get" => prompts::handle_prompts_get(request.params),
        method => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    };

    Some(JsonRpcResponse::new(request.id, result))
}
