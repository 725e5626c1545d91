use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::session::error::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Validation { .. } | SessionError::NoQuestions => {
                AppError::Validation(e.to_string())
            }
            SessionError::AlreadyAnswered { .. }
            | SessionError::AlreadyArmed { .. }
            | SessionError::InvalidTransition { .. }
            | SessionError::NotActiveQuestion { .. }
            | SessionError::TerminationInFlight { .. } => AppError::Conflict(e.to_string()),
            SessionError::ScoringUnavailable(msg) => AppError::Llm(msg),
            SessionError::SessionClosed(_) => AppError::NotFound(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::InterviewStatus;
    use crate::session::profile::ProfileField;

    fn status_of(e: SessionError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn test_session_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(SessionError::Validation {
                field: ProfileField::Email,
                message: "bad".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(SessionError::NoQuestions), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(SessionError::AlreadyAnswered { question_number: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SessionError::InvalidTransition {
                status: InterviewStatus::Completed,
                action: "start the interview"
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SessionError::SessionClosed(uuid::Uuid::nil())),
            StatusCode::NOT_FOUND
        );
    }
}
