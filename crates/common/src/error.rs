//! Error types for hollow-rs.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Lookup Errors ===
    /// A looked-up record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No live post has this ID.
    #[error("Post not found: {0}")]
    PostNotFound(i32),

    // === Backend Errors ===
    /// `PostgreSQL` query or connection failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Fast store command or connection failure.
    #[error("Redis error: {0}")]
    Redis(String),

    /// Task could not be queued or consumed.
    #[error("Queue error: {0}")]
    Queue(String),

    /// JSON encoding or decoding failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing or invalid setting.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Push service or mail relay failure.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code used in structured log fields.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::PostNotFound(_) => "POST_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<fred::error::Error> for AppError {
    fn from(err: fred::error::Error) -> Self {
        Self::Redis(err.to_string())
    }
}
