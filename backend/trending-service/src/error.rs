use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to start server: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::StartServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}

/// Errors from the leaderboard backing store
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the persistent counter store collaborator
#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("video {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for CounterStoreError {
    fn from(e: sqlx::Error) -> Self {
        CounterStoreError::Database(e.to_string())
    }
}

/// Errors raised while delivering a notification
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned to producers by the event queue
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("event queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("event queue is closed")]
    Closed,
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        AppError::ServiceUnavailable(e.to_string())
    }
}

impl From<LeaderboardError> for AppError {
    fn from(e: LeaderboardError) -> Self {
        AppError::ServiceUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_maps_to_503() {
        let err: AppError = QueueError::Full { capacity: 8 }.into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            err.to_string(),
            "service unavailable: event queue is full (capacity 8)"
        );
    }

    #[test]
    fn test_bad_request_body() {
        let err = AppError::BadRequest("limit must be between 1 and 100".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let err: PublishError = json_err.into();
        assert!(matches!(err, PublishError::Serialization(_)));
    }
}
