//! Staff login and token refresh. These routes run inside the tenant layer
//! but before authentication.

use axum::extract::State;

use super::HandlerResult;
use crate::http::dto::ApiResponse;
use crate::http::extract::{ApiJson, CurrentTenant};
use crate::http::state::AppState;
use crate::services::auth::{self, LoginRequest, LoginResponse, RefreshRequest};
use crate::services::TokenPair;

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<LoginRequest>,
) -> HandlerResult<LoginResponse> {
    let response = auth::login(state.repository.as_ref(), &state.tokens, &tenant, request).await?;
    Ok(ApiResponse::ok(response))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> HandlerResult<TokenPair> {
    let tokens = auth::refresh(state.repository.as_ref(), &state.tokens, &tenant, request).await?;
    Ok(ApiResponse::ok(tokens))
}
