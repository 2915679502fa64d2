//! Error types for the fitness coach.

use std::time::Duration;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::coach::CoachPhase;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Conversation flow errors.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("Session {id} not found")]
    SessionNotFound { id: uuid::Uuid },

    #[error("Session is {phase}, cannot {action}")]
    InvalidPhase { phase: CoachPhase, action: String },

    #[error("Answer must not be empty")]
    EmptyAnswer,

    #[error("Expected {expected} answers, got {actual}")]
    IncompleteAnswers { expected: usize, actual: usize },
}

/// Errors returned by HTTP handlers.
///
/// Client errors carry their message to the caller. Server errors are logged
/// and rendered as a generic message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Upstream failure: {0}")]
    Upstream(#[from] LlmError),

    #[error("Storage failure: {0}")]
    Storage(DatabaseError),
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound { entity, .. } if entity == "user" => {
                ApiError::NotFound("User not found".to_string())
            }
            other => ApiError::Storage(other),
        }
    }
}

impl From<CoachError> for ApiError {
    fn from(e: CoachError) -> Self {
        match e {
            CoachError::SessionNotFound { .. } => ApiError::NotFound("Session not found".into()),
            CoachError::EmptyAnswer => ApiError::Validation(e.to_string()),
            CoachError::InvalidPhase { .. } | CoachError::IncompleteAnswers { .. } => {
                ApiError::Conflict(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        tracing::debug!(error = %e, "Rejected request body");
        ApiError::Validation("Invalid request body".to_string())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        tracing::debug!(error = %e, "Rejected path parameter");
        ApiError::Validation("Invalid path parameter".to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_maps_to_not_found() {
        let err: ApiError = DatabaseError::NotFound {
            entity: "user".into(),
            id: "user_123".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "User not found");
    }

    #[test]
    fn query_failure_is_server_error() {
        let err: ApiError = DatabaseError::Query("disk I/O error".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn coach_errors_map_to_client_statuses() {
        let empty: ApiError = CoachError::EmptyAnswer.into();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let phase: ApiError = CoachError::InvalidPhase {
            phase: CoachPhase::Generating,
            action: "accept an answer".into(),
        }
        .into();
        assert_eq!(phase.status(), StatusCode::CONFLICT);

        let missing: ApiError = CoachError::SessionNotFound {
            id: uuid::Uuid::nil(),
        }
        .into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn server_error_body_hides_detail() {
        let err = ApiError::Upstream(LlmError::RequestFailed {
            provider: "huggingface".into(),
            reason: "secret upstream detail".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal Server Error");
    }
}
