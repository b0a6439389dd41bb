use rappelconso_core::error::QueryError;
use rappelconso_core::params::{SearchRequest, MAX_LIMIT, MIN_LIMIT};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use super::{parse_arguments, tool_result, JsonRpcError, ServerState};

/// Tool arguments carry values as JSON scalars; the upstream wants text.
fn scalar_map(
    argument: &str,
    map: Option<Map<String, Value>>,
) -> Result<BTreeMap<String, String>, QueryError> {
    map.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            Value::Number(number) => Ok((key, number.to_string())),
            Value::Bool(flag) => Ok((key, flag.to_string())),
            _ => Err(QueryError::invalid_input(format!(
                "{argument}.{key} must be a string, number or boolean"
            ))),
        })
        .collect()
}

/// Any JSON number is accepted so that a bad limit comes back as `invalid_input`.
fn integer_limit(limit: Option<Number>) -> Result<Option<i64>, QueryError> {
    match limit {
        None => Ok(None),
        Some(number) => number.as_i64().map(Some).ok_or_else(|| {
            QueryError::invalid_input(format!(
                "limit must be an integer between {MIN_LIMIT} and {MAX_LIMIT}, got {number}"
            ))
        }),
    }
}

pub async fn handle_search(
    arguments: Option<Value>,
    state: &ServerState,
) -> Result<Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct SearchArgs {
        limit: Option<Number>,
        order_by: Option<String>,
        #[serde(rename = "where")]
        where_clause: Option<String>,
        filters: Option<Map<String, Value>>,
        q: Option<String>,
        refine: Option<Map<String, Value>>,
    }

    let args: SearchArgs = parse_arguments(arguments)?;

    log::debug!(
        "Calling get_rappels_conso: limit={:?}, order_by={:?}, where={:?}",
        args.limit,
        args.order_by,
        args.where_clause
    );

    let request = scalar_map("filters", args.filters).and_then(|filters| {
        Ok(SearchRequest {
            limit: integer_limit(args.limit)?,
            order_by: args.order_by,
            where_clause: args.where_clause,
            filters,
            q: args.q,
            refine: scalar_map("refine", args.refine)?,
        })
    });

    let result = match request {
        Ok(request) => state.client.search(&request).await,
        Err(error) => Err(error),
    };

    tool_result(result)
}

pub async fn handle_latest(
    arguments: Option<Value>,
    state: &ServerState,
) -> Result<Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct LatestArgs {
        limit: Option<Number>,
    }

    let args: LatestArgs = parse_arguments(arguments)?;

    log::debug!("Calling get_latest_rappels: limit={:?}", args.limit);

    let result = match integer_limit(args.limit) {
        Ok(limit) => state.client.latest(limit).await,
        Err(error) => Err(error),
    };

    tool_result(result)
}

pub async fn handle_category_counts(state: &ServerState) -> Result<Value, JsonRpcError> {
    log::debug!("Calling get_categories_with_counts");

    tool_result(state.client.category_counts().await)
}

pub async fn handle_top_category(state: &ServerState) -> Result<Value, JsonRpcError> {
    log::debug!("Calling get_most_represented_category");

    tool_result(state.client.top_category().await)
}

pub async fn handle_latest_by_category(
    arguments: Option<Value>,
    state: &ServerState,
) -> Result<Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct ByCategoryArgs {
        category: String,
        limit: Option<Number>,
    }

    let args: ByCategoryArgs = parse_arguments(arguments)?;

    log::debug!(
        "Calling get_latest_from_category: category={:?}, limit={:?}",
        args.category,
        args.limit
    );

    let result = match integer_limit(args.limit) {
        Ok(limit) => state.client.latest_by_category(&args.category, limit).await,
        Err(error) => Err(error),
    };

    tool_result(result)
}
