//! Tenant administration. Mounted outside the tenant layer; requires an
//! admin token when authentication is enforced.

use axum::extract::State;

use super::{CreatedResult, HandlerResult};
use crate::http::dto::{ApiResponse, ListData, UsageQuery};
use crate::http::extract::{ApiJson, ApiPath, ApiQuery};
use crate::http::state::AppState;
use crate::models::{CreateTenant, Tenant, TenantId, TenantUsage, UpdateTenant, UsageSummary};
use crate::services::tenants;

pub async fn list_tenants(State(state): State<AppState>) -> HandlerResult<ListData<Tenant>> {
    let all = tenants::list_tenants(state.repository.as_ref()).await?;
    Ok(ApiResponse::list("tenants", all))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TenantId>,
) -> HandlerResult<Tenant> {
    Ok(ApiResponse::ok(
        tenants::get_tenant(state.repository.as_ref(), id).await?,
    ))
}

pub async fn create_tenant(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateTenant>,
) -> CreatedResult<Tenant> {
    let tenant = tenants::create_tenant(state.repository.as_ref(), request).await?;
    tracing::info!(tenant = %tenant.slug, tier = %tenant.subscription_tier, "tenant created");
    Ok(ApiResponse::created(tenant))
}

pub async fn update_tenant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TenantId>,
    ApiJson(patch): ApiJson<UpdateTenant>,
) -> HandlerResult<Tenant> {
    let tenant = tenants::update_tenant(state.repository.as_ref(), id, patch).await?;
    Ok(ApiResponse::ok(tenant))
}

// =============================================================================
// Usage
// =============================================================================

/// GET /tenants/{id}/usage?since=
pub async fn usage_summary(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TenantId>,
    ApiQuery(query): ApiQuery<UsageQuery>,
) -> HandlerResult<UsageSummary> {
    let repo = state.repository.as_ref();
    tenants::get_tenant(repo, id).await?;
    let summary = tenants::usage_summary(repo, id, query.since()?).await?;
    Ok(ApiResponse::ok(summary))
}

/// GET /tenants/{id}/usage/records?since=&limit=
pub async fn usage_records(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TenantId>,
    ApiQuery(query): ApiQuery<UsageQuery>,
) -> HandlerResult<ListData<TenantUsage>> {
    let repo = state.repository.as_ref();
    tenants::get_tenant(repo, id).await?;
    let records = tenants::recent_usage(repo, id, query.since()?, query.limit()).await?;
    Ok(ApiResponse::list("usage", records))
}
