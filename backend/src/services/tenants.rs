//! Tenant administration, lookup, quotas and feature gates.

use chrono::{DateTime, Utc};

use super::{schema_fallback, validation};
use crate::db::repository::{FullRepository, RepositoryError};
use crate::error::{AppError, AppResult};
use crate::models::{CreateTenant, Tenant, TenantId, TenantUsage, UpdateTenant, UsageSummary};

/// Countable things a tenant's plan may cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Customers,
    Staff,
    Resources,
}

impl Quota {
    fn limit(&self, tenant: &Tenant) -> Option<i32> {
        match self {
            Quota::Customers => tenant.max_customers,
            Quota::Staff => tenant.max_staff,
            Quota::Resources => tenant.max_resources,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Quota::Customers => "customers",
            Quota::Staff => "staff members",
            Quota::Resources => "resources",
        }
    }
}

/// Fail with 403 when adding one more item would exceed the tenant's cap.
pub fn ensure_quota(tenant: &Tenant, quota: Quota, current: u64) -> AppResult<()> {
    match quota.limit(tenant) {
        Some(limit) if current >= limit.max(0) as u64 => Err(AppError::authorization(format!(
            "Tenant quota exceeded: plan allows at most {} {}",
            limit,
            quota.label()
        ))
        .with_details(serde_json::json!({
            "quota": quota.label(),
            "limit": limit,
            "current": current,
        }))),
        _ => Ok(()),
    }
}

/// Fail with 403 unless the tenant has `feature` through its tier or an explicit flag.
pub fn require_feature(tenant: &Tenant, feature: &str) -> AppResult<()> {
    if tenant.has_feature(feature) {
        Ok(())
    } else {
        Err(AppError::authorization(format!(
            "Feature '{}' is not enabled for this tenant",
            feature
        )))
    }
}

/// Look a tenant up by UUID or slug.
pub async fn resolve_tenant<R: FullRepository + ?Sized>(repo: &R, key: &str) -> AppResult<Tenant> {
    let key = key.trim();
    let lookup = match key.parse::<TenantId>() {
        Ok(id) => repo.get_tenant(id).await,
        Err(_) => repo.get_tenant_by_slug(&key.to_lowercase()).await,
    };
    match lookup {
        Ok(tenant) => Ok(tenant),
        Err(RepositoryError::NotFound { .. }) => {
            Err(AppError::not_found(format!("Tenant '{}' not found", key)))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn create_tenant<R: FullRepository + ?Sized>(
    repo: &R,
    request: CreateTenant,
) -> AppResult<Tenant> {
    validation::require_text(&request.name, "name")?;
    let slug = request.slug.trim().to_lowercase();
    validation::validate_slug(&slug)?;
    validate_limits(
        [
            request.max_customers,
            request.max_staff,
            request.max_resources,
            request.rate_limit_per_minute,
        ]
        .into_iter()
        .flatten(),
    )?;

    let now = Utc::now();
    let tenant = Tenant {
        id: TenantId::generate(),
        name: request.name.trim().to_string(),
        slug,
        subscription_tier: request.subscription_tier,
        features: normalise_features(request.features),
        max_customers: request.max_customers,
        max_staff: request.max_staff,
        max_resources: request.max_resources,
        rate_limit_per_minute: request.rate_limit_per_minute,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let created = repo.create_tenant(tenant).await?;
    log::info!("Created tenant {} ({})", created.slug, created.id);
    Ok(created)
}

pub async fn get_tenant<R: FullRepository + ?Sized>(repo: &R, id: TenantId) -> AppResult<Tenant> {
    Ok(repo.get_tenant(id).await?)
}

pub async fn list_tenants<R: FullRepository + ?Sized>(repo: &R) -> AppResult<Vec<Tenant>> {
    Ok(repo.list_tenants().await?)
}

pub async fn update_tenant<R: FullRepository + ?Sized>(
    repo: &R,
    id: TenantId,
    mut patch: UpdateTenant,
) -> AppResult<Tenant> {
    if let Some(name) = &patch.name {
        validation::require_text(name, "name")?;
    }
    validate_limits(
        [
            patch.max_customers,
            patch.max_staff,
            patch.max_resources,
            patch.rate_limit_per_minute,
        ]
        .into_iter()
        .flatten()
        .flatten(),
    )?;
    patch.features = patch.features.map(normalise_features);

    let mut tenant = repo.get_tenant(id).await?;
    patch.apply(&mut tenant);
    Ok(repo.update_tenant(tenant).await?)
}

/// Usage totals since `since`; an empty summary when the usage table is missing.
pub async fn usage_summary<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    since: Option<DateTime<Utc>>,
) -> AppResult<UsageSummary> {
    match repo.usage_summary(tenant, since).await {
        Err(RepositoryError::SchemaError { message, .. }) => {
            log::warn!("Usage table unavailable, reporting no usage: {}", message);
            Ok(UsageSummary::from_records(tenant, since, &[]))
        }
        other => Ok(other?),
    }
}

pub async fn recent_usage<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    since: Option<DateTime<Utc>>,
    limit: usize,
) -> AppResult<Vec<TenantUsage>> {
    schema_fallback::or_empty(repo.list_usage(tenant, since, limit).await, "usage records")
}

fn validate_limits(values: impl Iterator<Item = i32>) -> AppResult<()> {
    for v in values {
        if v < 0 {
            return Err(AppError::validation("Quota and rate limit values must not be negative"));
        }
    }
    Ok(())
}

fn normalise_features(features: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = features
        .into_iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}
