//! `POST /api/generate`: proxy a chat completion to the hosted model.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use super::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::error::ApiError;

/// Shared state for the generate route.
#[derive(Clone)]
pub struct GenerateState {
    pub llm: Arc<dyn LlmProvider>,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

/// POST /api/generate
///
/// Returns the first choice's `{role, content}`. The provider applies its
/// configured output token budget.
async fn generate(
    State(state): State<GenerateState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<ChatMessage>, ApiError> {
    let Json(body) = body?;
    if body.messages.is_empty() {
        return Err(ApiError::Validation("Missing messages".into()));
    }

    let request = CompletionRequest::new(body.messages);
    let response = state.llm.complete(request).await?;
    tracing::info!(
        model = state.llm.model_name(),
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "Generated completion"
    );
    Ok(Json(response.message))
}

/// Build the completion proxy route.
pub fn generate_routes(state: GenerateState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .with_state(state)
}
