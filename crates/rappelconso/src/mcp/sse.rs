use crate::prelude::{eprintln, *};
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::ServerState;

fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn run_sse(options: super::cli::SseOptions, state: ServerState) -> Result<()> {
    let addr = format!("{}:{}", options.host, options.port);
    let verbose = state.global.verbose;

    if verbose {
        eprintln!(
            "Starting RappelConso MCP server on {addr} (upstream: {})",
            state.client.base_url()
        );
    }

    let app_router = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    if verbose {
        eprintln!("SSE endpoint: http://{addr}/sse");
        eprintln!("Message endpoint: http://{addr}/message");
    }
    log::info!("MCP server listening on {addr}");

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

async fn sse_handler(
    State(_state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::once(async {
        Ok(Event::default()
            .event("endpoint")
            .data("/message"))
    });
    Sse::new(stream)
}

async fn message_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<serde_json::Value>,
) -> Response {
    let request_str = serde_json::to_string(&request).unwrap_or_default();

    match super::handle_request(&request_str, &state).await {
        Some(response) => {
            Json(serde_json::to_value(response).unwrap_or(serde_json::Value::Null)).into_response()
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}
