use rappelconso_core::prompt::{product_recall_question, PRODUCT_ARGUMENT, PRODUCT_RECALL_PROMPT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Content, JsonRpcError};

#[derive(Debug, Serialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Serialize)]
pub struct PromptsList {
    pub prompts: Vec<Prompt>,
}

#[derive(Debug, Deserialize)]
pub struct GetPromptParams {
    pub name: String,
    #[serde(default)]
    pub arguments: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: Content,
}

#[derive(Debug, Serialize)]
pub struct GetPromptResult {
    pub description: String,
    pub messages: Vec<PromptMessage>,
}

const PRODUCT_RECALL_DESCRIPTION: &str = "Ask whether a product has been recalled";

pub fn handle_prompts_list() -> Result<serde_json::Value, JsonRpcError> {
    let result = PromptsList {
        prompts: vec![Prompt {
            name: PRODUCT_RECALL_PROMPT.to_string(),
            description: PRODUCT_RECALL_DESCRIPTION.to_string(),
            arguments: vec![PromptArgument {
                name: PRODUCT_ARGUMENT.to_string(),
                description: "Product label to look up (e.g., 'chocolat noir')".to_string(),
                required: true,
            }],
        }],
    };

    serde_json::to_value(result).map_err(JsonRpcError::internal)
}

pub fn handle_prompts_get(
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: GetPromptParams =
        serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
            .map_err(JsonRpcError::invalid_params)?;

    if params.name != PRODUCT_RECALL_PROMPT {
        return Err(JsonRpcError::invalid_params(format!(
            "Unknown prompt: {}",
            params.name
        )));
    }

    let product = params
        .arguments
        .get(PRODUCT_ARGUMENT)
        .ok_or_else(|| JsonRpcError::invalid_params(format!("missing {PRODUCT_ARGUMENT}")))?;
    let text = product_recall_question(product).map_err(JsonRpcError::invalid_params)?;

    let result = GetPromptResult {
        description: PRODUCT_RECALL_DESCRIPTION.to_string(),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: Content::Text { text },
        }],
    };

    serde_json::to_value(result).map_err(JsonRpcError::internal)
}
