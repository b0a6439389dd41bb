mod recalls;

use rappelconso_core::error::QueryError;
use rappelconso_core::params::{
    SortOrder, DEFAULT_CATEGORY_LIMIT, DEFAULT_LATEST_LIMIT, DEFAULT_SEARCH_LIMIT, MAX_LIMIT,
    MIN_LIMIT,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// Re-export types needed by tool handlers
pub use super::{Content, JsonRpcError, ServerState, Tool};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
    pub prompts: Option<PromptsCapability>,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct PromptsCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Deserialize tool arguments; a missing object counts as `{}`
pub fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    let arguments = match arguments {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(value) => value,
    };

    serde_json::from_value(arguments).map_err(JsonRpcError::invalid_params)
}

/// Wrap an operation outcome in a `CallToolResult`
///
/// A `QueryError` is a tool-level failure: it is reported as the text
/// content with `isError` set, not as a JSON-RPC error.
pub fn tool_result<T: Serialize>(
    result: Result<T, QueryError>,
) -> Result<serde_json::Value, JsonRpcError> {
    let (text, is_error) = match result {
        Ok(output) => (
            serde_json::to_string_pretty(&output).map_err(JsonRpcError::internal)?,
            None,
        ),
        Err(error) => {
            log::warn!("Tool failed: {error}");
            (
                serde_json::to_string_pretty(&error).map_err(JsonRpcError::internal)?,
                Some(true),
            )
        }
    };

    let result = CallToolResult {
        content: vec![Content::Text { text }],
        is_error,
    };

    serde_json::to_value(result).map_err(JsonRpcError::internal)
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: super::PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
            prompts: Some(PromptsCapability {}),
        },
        server_info: ServerInfo {
            name: "RappelConso".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(JsonRpcError::internal)
}

fn limit_schema(default: i64) -> serde_json::Value {
    serde_json::json!({
        "type": "integer",
        "minimum": MIN_LIMIT,
        "maximum": MAX_LIMIT,
        "description": format!("Number of recalls to return ({MIN_LIMIT}-{MAX_LIMIT}, default: {default})")
    })
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let tools = vec![
        Tool {
            name: "get_rappels_conso".to_string(),
            description: "Search French product recalls (RappelConso). Supports exact-match filters on dataset fields, a raw filter expression in the Opendatasoft query language, full-text search and a sort order. Returns {total_count, results} where each result carries the recall fields (libelle, marque_produit, categorie_produit, motif_rappel, risques_encourus, date_publication, ...).".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "limit": limit_schema(DEFAULT_SEARCH_LIMIT),
                    "order_by": {
                        "type": "string",
                        "description": "Sort order",
                        "enum": SortOrder::allowed_values()
                    },
                    "where": {
                        "type": "string",
                        "description": "Raw filter expression (e.g., \"date_publication >= '2024-01-01'\"). Every referenced field must exist in the dataset."
                    },
                    "filters": {
                        "type": "object",
                        "description": "Field to value map; each entry matches recalls whose field contains the value (e.g., {\"marque_produit\": \"Acme\"}). Unknown fields are ignored.",
                        "additionalProperties": {"type": ["string", "number", "boolean"]}
                    },
                    "q": {
                        "type": "string",
                        "description": "Full-text query over all fields"
                    },
                    "refine": {
                        "type": "object",
                        "description": "Facet refinements, field to exact value (e.g., {\"categorie_produit\": \"Alimentation\"})",
                        "additionalProperties": {"type": ["string", "number", "boolean"]}
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: "get_latest_rappels".to_string(),
            description: "List the most recently published product recalls, newest first.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "limit": limit_schema(DEFAULT_LATEST_LIMIT)
                },
                "required": []
            }),
        },
        Tool {
            name: "get_categories_with_counts".to_string(),
            description: "Count recalls per product category. Returns {categories: [{name, count}]}.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: "get_most_represented_category".to_string(),
            description: "Return the product category with the most recalls as {category, count}.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: "get_latest_from_category".to_string(),
            description: "List the most recent recalls of one product category (e.g., 'Alimentation'), newest first.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Product category, matched exactly"
                    },
                    "limit": limit_schema(DEFAULT_CATEGORY_LIMIT)
                },
                "required": ["category"]
            }),
        },
    ];

    let result = ToolsList { tools };

    serde_json::to_value(result).map_err(JsonRpcError::internal)
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(JsonRpcError::invalid_params)?;

    match params.name.as_str() {
        "get_rappels_conso" => recalls::handle_search(params.arguments, state).await,
        "get_latest_rappels" => recalls::handle_latest(params.arguments, state).await,
        "get_categories_with_counts" => recalls::handle_category_counts(state).await,
        "get_most_represented_category" => recalls::handle_top_category(state).await,
        "get_latest_from_category" => {
            recalls::handle_latest_by_category(params.arguments, state).await
        }
        _ => Err(JsonRpcError::invalid_params(format!(
            "Unknown tool: {}",
            params.name
        ))),
    }
}
