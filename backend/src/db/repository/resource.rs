//! Kennels, services and add-ons.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    AddOnFilter, AddOnId, AddOnService, Resource, ResourceFilter, ResourceId, Service,
    ServiceFilter, ServiceId, TenantId,
};

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    // ==================== Resources ====================

    async fn create_resource(&self, resource: Resource) -> RepositoryResult<Resource>;

    async fn get_resource(&self, tenant: TenantId, id: ResourceId) -> RepositoryResult<Resource>;

    /// Filtered resources ordered by suite number, then name.
    async fn list_resources(
        &self,
        tenant: TenantId,
        filter: &ResourceFilter,
    ) -> RepositoryResult<Vec<Resource>>;

    async fn update_resource(&self, resource: Resource) -> RepositoryResult<Resource>;

    /// # Errors
    /// `ConflictError` while an active reservation holds the resource.
    async fn delete_resource(&self, tenant: TenantId, id: ResourceId) -> RepositoryResult<()>;

    async fn count_resources(&self, tenant: TenantId) -> RepositoryResult<u64>;

    // ==================== Services ====================

    async fn create_service(&self, service: Service) -> RepositoryResult<Service>;

    async fn get_service(&self, tenant: TenantId, id: ServiceId) -> RepositoryResult<Service>;

    async fn list_services(
        &self,
        tenant: TenantId,
        filter: &ServiceFilter,
    ) -> RepositoryResult<Vec<Service>>;

    async fn update_service(&self, service: Service) -> RepositoryResult<Service>;

    /// # Errors
    /// `ConflictError` while any reservation references the service.
    async fn delete_service(&self, tenant: TenantId, id: ServiceId) -> RepositoryResult<()>;

    // ==================== Add-ons ====================

    async fn create_add_on(&self, add_on: AddOnService) -> RepositoryResult<AddOnService>;

    async fn get_add_on(&self, tenant: TenantId, id: AddOnId) -> RepositoryResult<AddOnService>;

    async fn list_add_ons(
        &self,
        tenant: TenantId,
        filter: &AddOnFilter,
    ) -> RepositoryResult<Vec<AddOnService>>;

    async fn update_add_on(&self, add_on: AddOnService) -> RepositoryResult<AddOnService>;

    async fn delete_add_on(&self, tenant: TenantId, id: AddOnId) -> RepositoryResult<()>;
}
