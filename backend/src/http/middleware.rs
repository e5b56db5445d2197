//! Request middleware, outermost first:
//!
//! 1. [`error_envelope`] logs failed requests and renders errors for the
//!    configured environment.
//! 2. [`authenticate`] verifies the bearer token.
//! 3. [`resolve_tenant`] picks the tenant and applies its rate limit.
//! 4. [`record_usage`] meters the request against the tenant.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::error::error_response;
use super::state::AppState;
use crate::db::repository::UsageRepository;
use crate::error::AppError;
use crate::models::{Tenant, TenantUsage};
use crate::services::{self, Claims};

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Tenant slug attached to responses for request logging.
#[derive(Debug, Clone)]
struct TenantTag(String);

pub async fn error_envelope(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    let error = match response.extensions().get::<AppError>() {
        Some(error) => error.clone(),
        None if response.status() == StatusCode::METHOD_NOT_ALLOWED => AppError {
            status: StatusCode::METHOD_NOT_ALLOWED.as_u16(),
            ..AppError::validation("Method not allowed")
        },
        None => return response,
    };
    let tenant = response
        .extensions()
        .get::<TenantTag>()
        .map(|t| t.0.as_str())
        .unwrap_or("-");

    if error.is_server_error() {
        tracing::error!(%method, %path, tenant, error = %error, context = ?error.context, "request failed");
    } else {
        tracing::warn!(%method, %path, tenant, error = %error, "request rejected");
    }

    let mut rendered = error_response(&error, state.config.is_production());
    for (name, value) in response.headers() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::authentication("Malformed Authorization header"))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AppError::authentication("Authorization header must be 'Bearer <token>'")),
    }
}

/// Verify the bearer token when present. Without one the request continues
/// anonymously unless `REQUIRE_AUTH` is on.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match bearer_token(req.headers())? {
        Some(token) => {
            let claims = state.tokens.verify_access(token)?;
            req.extensions_mut().insert(claims);
        }
        None if state.config.require_auth => {
            return Err(AppError::authentication("Authentication required"));
        }
        None => {}
    }
    Ok(next.run(req).await)
}

/// Tenant administration needs an admin token whenever auth is enforced.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.config.require_auth {
        match req.extensions().get::<Claims>() {
            Some(claims) if claims.is_admin() => {}
            Some(_) => return Err(AppError::authorization("Admin role required")),
            None => return Err(AppError::authentication("Authentication required")),
        }
    }
    Ok(next.run(req).await)
}

/// Header value, else token claim, else the development default tenant.
fn tenant_key(state: &AppState, headers: &HeaderMap, claims: Option<&Claims>) -> Result<String, AppError> {
    if let Some(value) = headers.get(TENANT_HEADER) {
        let value = value
            .to_str()
            .map_err(|_| AppError::validation("x-tenant-id header is not valid text"))?
            .trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }
    if let Some(claims) = claims {
        return Ok(claims.tenant_id.to_string());
    }
    match &state.config.default_tenant {
        Some(slug) if !state.config.is_production() => Ok(slug.clone()),
        _ => Err(AppError::validation("Tenant id is required (x-tenant-id header)")),
    }
}

pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req.extensions().get::<Claims>().cloned();
    let key = tenant_key(&state, req.headers(), claims.as_ref())?;
    let tenant = services::resolve_tenant(state.repository.as_ref(), &key).await?;

    if !tenant.is_active {
        return Err(AppError::authorization("Tenant is inactive"));
    }
    if let Some(claims) = &claims {
        if claims.tenant_id != tenant.id {
            return Err(AppError::authorization("Token was issued for a different tenant"));
        }
    }

    let tag = TenantTag(tenant.slug.clone());
    let limit = tenant
        .rate_limit_per_minute
        .map(|l| l.max(0) as u32)
        .unwrap_or(state.config.rate_limit_per_minute);
    if let Err(retry_after) = state.rate_limiter.check(tenant.id, limit) {
        let mut response = AppError::rate_limited("Too many requests")
            .with_details(json!({"limit": limit, "retryAfterSeconds": retry_after}))
            .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        response.extensions_mut().insert(tag);
        return Ok(response);
    }

    req.extensions_mut().insert(tenant);
    let mut response = next.run(req).await;
    response.extensions_mut().insert(tag);
    Ok(response)
}

/// Write one usage row per tenant request. Metering never fails the request.
pub async fn record_usage(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(tenant) = req.extensions().get::<Tenant>().map(|t| t.id) else {
        return next.run(req).await;
    };
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let usage = TenantUsage::new(
        tenant,
        endpoint,
        method,
        response.status().as_u16(),
        started.elapsed().as_millis() as i64,
    );
    if let Err(e) = state.repository.record_usage(usage).await {
        tracing::warn!(tenant = %tenant, error = %e, "failed to record usage");
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(auth: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        map
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&HeaderMap::new()).unwrap(), None);
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer  xyz ")).unwrap(), Some("xyz"));
        assert_eq!(bearer_token(&headers("Basic Zm9v")).unwrap_err().status, 401);
        assert_eq!(bearer_token(&headers("Bearer ")).unwrap_err().status, 401);
    }

    #[test]
    fn test_tenant_key_precedence() {
        let repo = std::sync::Arc::new(crate::db::LocalRepository::new());
        let mut config = crate::config::ServiceConfig::new(0);
        config.default_tenant = Some("dev".into());
        let state = AppState::new("test", repo, config);

        let mut map = HeaderMap::new();
        assert_eq!(tenant_key(&state, &map, None).unwrap(), "dev");

        map.insert(TENANT_HEADER, HeaderValue::from_static(" acme "));
        assert_eq!(tenant_key(&state, &map, None).unwrap(), "acme");
    }

    #[test]
    fn test_production_has_no_default_tenant() {
        let repo = std::sync::Arc::new(crate::db::LocalRepository::new());
        let mut config = crate::config::ServiceConfig::new(0);
        config.environment = crate::config::Environment::Production;
        let state = AppState::new("test", repo, config);
        assert_eq!(tenant_key(&state, &HeaderMap::new(), None).unwrap_err().status, 400);
    }
}
