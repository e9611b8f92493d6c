use crate::connectors::ConnectorError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;

/// Failure taxonomy shared by the store, the chat service, REST routes and the gateway.
///
/// `StoreUnavailable` carries the underlying detail for logs only; callers see a
/// generic message.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Authentication required")]
    AuthenticationRequired,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    PolicyViolation(String),
    #[error("You are not a participant of this conversation")]
    NotParticipant,
    #[error("{0} not found")]
    NotFound(String),
    #[error("User directory is unavailable")]
    DirectoryUnavailable(String),
    #[error("Storage error")]
    StoreUnavailable(String),
    #[error("Realtime gateway unavailable")]
    RealtimeUnavailable,
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conversation_not_found() -> Self {
        Self::NotFound("Conversation".to_string())
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PolicyViolation(_) | Self::NotParticipant => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DirectoryUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RealtimeUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<ConnectorError> for ChatError {
    fn from(err: ConnectorError) -> Self {
        tracing::error!("User directory call failed: {}", err);
        Self::DirectoryUnavailable(err.to_string())
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Failed to execute query: {:?}", err);
        Self::StoreUnavailable(err.to_string())
    }
}
