use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use klara_chat::ChatError;
use klara_persist::PersistError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Duplicate request, please wait before retrying")]
    Duplicate,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            ChatError::DuplicateRequest => ApiError::Duplicate,
            ChatError::Forbidden(msg) => ApiError::Forbidden(msg),
            ChatError::Storage(e) => ApiError::Persist(e),
            ChatError::Cache(e) => ApiError::Internal(e.to_string()),
            ChatError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", self.to_string())
            }
            ApiError::Duplicate => (
                StatusCode::TOO_MANY_REQUESTS,
                "DUPLICATE_REQUEST",
                self.to_string(),
            ),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            ApiError::ConversationNotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Storage error".to_string(),
                )
            }
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
