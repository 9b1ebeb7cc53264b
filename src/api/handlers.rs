//! HTTP request handlers

use super::sse::turn_stream;
use super::types::{ErrorResponse, HealthResponse, ToolInfo, ToolsResponse, ValidateResponse};
use super::AppState;
use crate::protocol::ChatRequest;
use crate::turn::EventSink;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::Value;
use std::convert::Infallible;

/// Events buffered between the executor and a slow client
const EVENT_BUFFER: usize = 64;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Turn streaming
        .route("/api/chat/send", post(send_chat))
        .route("/api/chat/validate", post(validate_chat))
        .route("/api/chat/tools", get(list_tools))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .fallback(not_found)
        .with_state(state)
}

// ============================================================
// Turn Streaming
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (sink, rx) = EventSink::channel(EVENT_BUFFER);
    let executor = state.executor.clone();

    // Runs until a terminal event is sent or the client disconnects
    tokio::spawn(async move {
        executor
            .run(&req.content, &req.conversation_history, &sink)
            .await;
    });

    Ok(turn_stream(rx))
}

/// Check a prospective request without running it
async fn validate_chat(Json(body): Json<Value>) -> Json<ValidateResponse> {
    let result = serde_json::from_value::<ChatRequest>(body)
        .map_err(|e| format!("Malformed request: {e}"))
        .and_then(|req| req.validate().map_err(|e| e.to_string()));

    Json(match result {
        Ok(()) => ValidateResponse {
            valid: true,
            error: None,
        },
        Err(error) => ValidateResponse {
            valid: false,
            error: Some(error),
        },
    })
}

// ============================================================
// Info
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let tools = state
        .executor
        .bridge()
        .available_tools()
        .iter()
        .map(ToolInfo::from)
        .collect();
    Json(ToolsResponse { tools })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.executor.model_id().map(str::to_string);
    Json(HealthResponse {
        status: "healthy".to_string(),
        llm_available: model.is_some(),
        model,
        tools_available: state.executor.bridge().available_tools().len(),
    })
}

async fn get_version() -> &'static str {
    concat!("worldsmith ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

async fn not_found() -> AppError {
    AppError::NotFound("No such endpoint".to_string())
}

enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
