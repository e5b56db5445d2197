//! HTTP rendering of [`AppError`].
//!
//! Handlers return `AppError`; its `IntoResponse` writes a production-safe
//! envelope and stashes the error in the response extensions. The error
//! middleware picks it up, logs it with the request context and re-renders
//! it for the configured environment.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, ErrorType};

/// Message shown for 5xx errors in production.
pub const GENERIC_SERVER_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// `{ "status": "error", "error": { type, message, details? } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    /// In production `details` are dropped and 5xx messages are replaced.
    pub fn render(error: &AppError, production: bool) -> Self {
        let message = if production && error.is_server_error() {
            GENERIC_SERVER_MESSAGE.to_string()
        } else {
            error.message.clone()
        };
        Self {
            status: "error".to_string(),
            error: ErrorBody {
                error_type: error.error_type,
                message,
                details: if production { None } else { error.details.clone() },
            },
        }
    }
}

pub fn error_response(error: &AppError, production: bool) -> Response {
    let status = StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(ErrorEnvelope::render(error, production))).into_response();
    response.extensions_mut().insert(error.clone());
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_response(&self, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_production_hides_internals() {
        let err = AppError::database("relation \"invoices\" does not exist")
            .with_details(json!({"table": "invoices"}));

        let prod = ErrorEnvelope::render(&err, true);
        assert_eq!(prod.error.message, GENERIC_SERVER_MESSAGE);
        assert!(prod.error.details.is_none());

        let dev = ErrorEnvelope::render(&err, false);
        assert!(dev.error.message.contains("invoices"));
        assert_eq!(dev.error.details, Some(json!({"table": "invoices"})));
    }

    #[test]
    fn test_client_errors_keep_message_in_production() {
        let err = AppError::validation("End date must be after start date");
        let value = serde_json::to_value(ErrorEnvelope::render(&err, true)).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "error",
                "error": {"type": "VALIDATION_ERROR", "message": "End date must be after start date"}
            })
        );
    }

    #[test]
    fn test_response_status_and_extension() {
        let response = AppError::booking_conflict("Suite 4 is taken").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let stored = response.extensions().get::<AppError>().unwrap();
        assert_eq!(stored.error_type, ErrorType::ResourceConflict);
    }
}
