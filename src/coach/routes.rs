//! REST endpoints for coaching sessions.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::manager::{AnswerReply, CoachManager, StartError};
use super::session::SessionSnapshot;
use crate::error::ApiError;

/// Shared state for coaching routes.
#[derive(Clone)]
pub struct CoachRouteState {
    pub manager: Arc<CoachManager>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    clerk_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    #[serde(default)]
    content: String,
}

impl From<StartError> for ApiError {
    fn from(e: StartError) -> Self {
        match e {
            StartError::Database(e) => e.into(),
            StartError::Coach(e) => e.into(),
        }
    }
}

/// POST /api/sessions
///
/// Starts a questionnaire. The response carries the welcome message and
/// the first question.
async fn start_session(
    State(state): State<CoachRouteState>,
    body: Result<Json<StartSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let Json(body) = body?;
    let clerk_id = body
        .clerk_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Missing clerkId".into()))?;

    let snapshot = state.manager.start_session(&clerk_id).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// POST /api/sessions/{id}/answers
///
/// Records one answer. The eighth answer blocks until the plan has been
/// generated and saved (or has failed).
async fn submit_answer(
    State(state): State<CoachRouteState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerReply>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let reply = state.manager.submit_answer(id, &body.content).await?;
    Ok(Json(reply))
}

/// GET /api/sessions/{id}
async fn get_session(
    State(state): State<CoachRouteState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.manager.snapshot(id).await?))
}

/// DELETE /api/sessions/{id}
async fn abandon_session(
    State(state): State<CoachRouteState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if state.manager.abandon(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Session not found".into()))
    }
}

/// Build the coaching session routes.
pub fn coach_routes(state: CoachRouteState) -> Router {
    Router::new()
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/{id}", get(get_session).delete(abandon_session))
        .route("/api/sessions/{id}/answers", post(submit_answer))
        .with_state(state)
}
