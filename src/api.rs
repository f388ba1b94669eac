//! REST API for the intent router
//!
//! Each request runs one graph turn on a fresh session state. The graph is
//! shared read-only across requests.

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::RouterError;
use crate::graph::DispatchGraph;
use crate::models::SessionState;
use crate::router::route;

pub const WELCOME: &str = "\
Welcome!

Here is what I can help you with:

1. Stock market analysis
   - Stock evolution: price changes for a specific company.
     Example: \"How is Tesla stock evolving?\"
   - Stock comparison: compare the performance of several companies.
     Example: \"Compare the stock performance of Apple and Microsoft.\"
   - Latest news: recent news about a company and its market impact.
     Example: \"What's the latest news about Amazon?\"

2. Weather
   - Current conditions for any city.
     Example: \"What's the weather like in Paris?\"

3. Web search
   - Look up the latest information on any topic.
     Example: \"what is a large language model?\"";

/// Characters per `token` event on the streaming endpoint
const STREAM_CHUNK_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Successful turn as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub category: Option<String>,
    pub destination: Option<String>,
    pub messages: Vec<String>,
    pub trace: Vec<String>,
}

impl ChatAnswer {
    fn from_state(state: SessionState) -> Self {
        let category = state.category().cloned();
        let destination = category.as_ref().map(|c| route(c).as_str().to_string());
        let trace = state.trace().to_vec();
        let messages = state.into_messages();

        Self {
            answer: messages.last().cloned().unwrap_or_default(),
            category: category.map(|c| c.as_str().to_string()),
            destination,
            messages,
            trace,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub graph: Arc<DispatchGraph>,
}

/// Message shown to the user when a turn fails
pub fn user_error(err: &RouterError) -> String {
    format!("An error occurred: {}", err)
}

fn error_status(err: &RouterError) -> StatusCode {
    match err {
        RouterError::Classification(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RouterError::Execution { .. } => StatusCode::BAD_GATEWAY,
        RouterError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Split an answer into chunks of at most `size` characters.
fn chunk_answer(answer: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = answer.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn welcome() -> Json<ApiResponse> {
    Json(ApiResponse::success(serde_json::json!({ "message": WELCOME })))
}

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(chars = req.message.chars().count(), "Received chat request");

    match state.graph.run_query(&req.message).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(ChatAnswer::from_state(session))),
        ),
        Err(e) => {
            warn!(error = %e, "Chat turn failed");
            (error_status(&e), Json(ApiResponse::error(user_error(&e))))
        }
    }
}

async fn chat_stream_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        match state.graph.run_query(&req.message).await {
            Ok(session) => {
                let answer = ChatAnswer::from_state(session);
                for chunk in chunk_answer(&answer.answer, STREAM_CHUNK_CHARS) {
                    let data = serde_json::json!({ "text": chunk }).to_string();
                    yield Ok::<_, Infallible>(Event::default().event("token").data(data));
                }
                let data = serde_json::to_string(&answer).unwrap_or_default();
                yield Ok(Event::default().event("done").data(data));
            }
            Err(e) => {
                warn!(error = %e, "Streaming chat turn failed");
                let data = serde_json::json!({ "error": user_error(&e) }).to_string();
                yield Ok(Event::default().event("error").data(data));
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

pub fn create_router(graph: Arc<DispatchGraph>) -> Router {
    let state = ApiState { graph };

    Router::new()
        .route("/health", get(health))
        .route("/api/welcome", get(welcome))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", post(chat_stream_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn start_server(
    graph: Arc<DispatchGraph>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(graph);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
