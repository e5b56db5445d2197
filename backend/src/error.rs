//! Application error shared by the service layer and both HTTP services.
//!
//! Every failure a client can see is an [`AppError`]: a machine-readable
//! [`ErrorType`], the HTTP status it maps to, a message and optional
//! structured details. The HTTP layer renders it into the error envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    ValidationError,
    AuthenticationError,
    AuthorizationError,
    ResourceNotFound,
    ResourceConflict,
    RateLimitExceeded,
    ServerError,
    DatabaseError,
    SchemaError,
}

impl ErrorType {
    /// Default HTTP status for the type.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorType::ValidationError => 400,
            ErrorType::AuthenticationError => 401,
            ErrorType::AuthorizationError => 403,
            ErrorType::ResourceNotFound => 404,
            ErrorType::ResourceConflict => 409,
            ErrorType::RateLimitExceeded => 429,
            ErrorType::ServerError | ErrorType::DatabaseError | ErrorType::SchemaError => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ValidationError => "VALIDATION_ERROR",
            ErrorType::AuthenticationError => "AUTHENTICATION_ERROR",
            ErrorType::AuthorizationError => "AUTHORIZATION_ERROR",
            ErrorType::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorType::ResourceConflict => "RESOURCE_CONFLICT",
            ErrorType::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorType::ServerError => "SERVER_ERROR",
            ErrorType::DatabaseError => "DATABASE_ERROR",
            ErrorType::SchemaError => "SCHEMA_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error_type}: {message}")]
pub struct AppError {
    pub error_type: ErrorType,
    /// Usually `error_type.status_code()`; reservation overlaps use 400.
    pub status: u16,
    pub message: String,
    /// Client-facing specifics, hidden in production.
    pub details: Option<Value>,
    /// Server-side diagnostics, logged but never rendered.
    pub context: Option<Value>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            status: error_type.status_code(),
            message: message.into(),
            details: None,
            context: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorType::ValidationError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorType::AuthenticationError, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorType::AuthorizationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorType::ResourceNotFound, message)
    }

    /// `"<Entity> with id <id> not found"`.
    pub fn entity_not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::not_found(format!("{} with id {} not found", entity, id))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorType::ResourceConflict, message)
    }

    /// A booking that collides with an existing reservation. Reported as a
    /// bad request carrying the conflict type.
    pub fn booking_conflict(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            ..Self::conflict(message)
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorType::RateLimitExceeded, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorType::ServerError, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorType::DatabaseError, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorType::SchemaError, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        let error_type = match &err {
            RepositoryError::NotFound { .. } => ErrorType::ResourceNotFound,
            RepositoryError::ValidationError { .. } => ErrorType::ValidationError,
            RepositoryError::ConflictError { .. } => ErrorType::ResourceConflict,
            RepositoryError::SchemaError { .. } => ErrorType::SchemaError,
            RepositoryError::ConnectionError { .. }
            | RepositoryError::QueryError { .. }
            | RepositoryError::TimeoutError { .. }
            | RepositoryError::TransactionError { .. } => ErrorType::DatabaseError,
            _ => ErrorType::ServerError,
        };

        let ctx = err.context();
        let context = serde_json::json!({
            "operation": ctx.operation,
            "entity": ctx.entity,
            "entityId": ctx.entity_id,
            "details": ctx.details,
            "retryable": ctx.retryable,
        });

        AppError::new(error_type, err.message()).with_context(context)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::validation(format!("Invalid JSON: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::server(err.to_string())
    }
}
