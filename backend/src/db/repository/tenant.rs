//! Tenant administration and connection health.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Tenant, TenantId};

#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Check if the backing store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store answered
    /// - `Ok(false)` if it is reachable but reports itself unhealthy
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Insert a tenant.
    ///
    /// # Errors
    /// `ConflictError` when the slug is already taken.
    async fn create_tenant(&self, tenant: Tenant) -> RepositoryResult<Tenant>;

    async fn get_tenant(&self, id: TenantId) -> RepositoryResult<Tenant>;

    /// Look a tenant up by its slug (exact, case-sensitive).
    async fn get_tenant_by_slug(&self, slug: &str) -> RepositoryResult<Tenant>;

    /// All tenants ordered by name.
    async fn list_tenants(&self) -> RepositoryResult<Vec<Tenant>>;

    /// Persist every mutable field of `tenant`. The slug is immutable.
    async fn update_tenant(&self, tenant: Tenant) -> RepositoryResult<Tenant>;
}
