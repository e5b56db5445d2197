//! HTTP handlers, one module per resource area.
//!
//! Handlers only translate between HTTP and the service layer: they pull the
//! tenant and typed inputs out of the request, call one service function and
//! wrap the result in the success envelope.

pub mod auth;
pub mod billing;
pub mod catalog;
pub mod customers;
pub mod jobs;
pub mod reports;
pub mod reservations;
pub mod staff;
pub mod tenants;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use super::dto::{ApiResponse, HealthResponse};
use super::state::AppState;
use crate::db::repository::TenantRepository;
use crate::error::AppError;

/// Result type for handlers.
pub type HandlerResult<T> = Result<ApiResponse<T>, AppError>;

/// Result type for handlers answering `201 Created`.
pub type CreatedResult<T> = Result<(StatusCode, ApiResponse<T>), AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Liveness plus a database check. Always 200 so load balancers can tell a
/// running process from a dead one; the `database` field carries the result.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };
    let status = if database == "connected" { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: Utc::now(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::not_found("Route not found")
}
