//! Kennels/suites, sellable services and add-ons.

use super::schema_fallback;
use super::tenants::{ensure_quota, Quota};
use super::validation;
use crate::db::repository::FullRepository;
use crate::error::{AppError, AppResult};
use crate::models::{
    AddOnFilter, AddOnId, AddOnService, CreateAddOn, CreateResource, CreateService, Resource,
    ResourceFilter, ResourceId, Service, ServiceFilter, ServiceId, Tenant, TenantId, UpdateAddOn,
    UpdateResource, UpdateService,
};

// ==================== Resources ====================

pub async fn create_resource<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: &Tenant,
    request: CreateResource,
) -> AppResult<Resource> {
    validation::require_text(&request.name, "name")?;
    validation::positive(request.capacity, "capacity")?;
    ensure_quota(tenant, Quota::Resources, repo.count_resources(tenant.id).await?)?;
    Ok(repo.create_resource(request.into_resource(tenant.id)).await?)
}

pub async fn get_resource<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ResourceId,
) -> AppResult<Resource> {
    Ok(repo.get_resource(tenant, id).await?)
}

pub async fn list_resources<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &ResourceFilter,
) -> AppResult<Vec<Resource>> {
    Ok(repo.list_resources(tenant, filter).await?)
}

pub async fn update_resource<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ResourceId,
    patch: UpdateResource,
) -> AppResult<Resource> {
    if let Some(v) = &patch.name {
        validation::require_text(v, "name")?;
    }
    if let Some(v) = patch.capacity {
        validation::positive(v, "capacity")?;
    }
    let mut resource = repo.get_resource(tenant, id).await?;
    patch.apply(&mut resource);
    Ok(repo.update_resource(resource).await?)
}

pub async fn delete_resource<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ResourceId,
) -> AppResult<()> {
    Ok(repo.delete_resource(tenant, id).await?)
}

// ==================== Services ====================

pub async fn create_service<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    request: CreateService,
) -> AppResult<Service> {
    validation::require_text(&request.name, "name")?;
    validation::non_negative(request.price, "price")?;
    if let Some(d) = request.duration_minutes {
        validation::positive(d, "durationMinutes")?;
    }
    Ok(repo.create_service(request.into_service(tenant)).await?)
}

pub async fn get_service<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ServiceId,
) -> AppResult<Service> {
    Ok(repo.get_service(tenant, id).await?)
}

pub async fn list_services<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &ServiceFilter,
) -> AppResult<Vec<Service>> {
    schema_fallback::or_empty(repo.list_services(tenant, filter).await, "services")
}

pub async fn update_service<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ServiceId,
    patch: UpdateService,
) -> AppResult<Service> {
    if let Some(v) = &patch.name {
        validation::require_text(v, "name")?;
    }
    if let Some(v) = patch.price {
        validation::non_negative(v, "price")?;
    }
    let mut service = repo.get_service(tenant, id).await?;
    patch.apply(&mut service);
    Ok(repo.update_service(service).await?)
}

pub async fn delete_service<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ServiceId,
) -> AppResult<()> {
    Ok(repo.delete_service(tenant, id).await?)
}

// ==================== Add-ons ====================

pub async fn create_add_on<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    request: CreateAddOn,
) -> AppResult<AddOnService> {
    validation::require_text(&request.name, "name")?;
    validation::non_negative(request.price, "price")?;
    if let Some(service) = request.service_id {
        ensure_service_link(repo, tenant, service).await?;
    }
    Ok(repo.create_add_on(request.into_add_on(tenant)).await?)
}

pub async fn get_add_on<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: AddOnId,
) -> AppResult<AddOnService> {
    Ok(repo.get_add_on(tenant, id).await?)
}

pub async fn list_add_ons<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &AddOnFilter,
) -> AppResult<Vec<AddOnService>> {
    schema_fallback::or_empty(repo.list_add_ons(tenant, filter).await, "add-ons")
}

pub async fn update_add_on<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: AddOnId,
    patch: UpdateAddOn,
) -> AppResult<AddOnService> {
    if let Some(v) = &patch.name {
        validation::require_text(v, "name")?;
    }
    if let Some(v) = patch.price {
        validation::non_negative(v, "price")?;
    }
    if let Some(Some(service)) = patch.service_id {
        ensure_service_link(repo, tenant, service).await?;
    }
    let mut add_on = repo.get_add_on(tenant, id).await?;
    patch.apply(&mut add_on);
    Ok(repo.update_add_on(add_on).await?)
}

pub async fn delete_add_on<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: AddOnId,
) -> AppResult<()> {
    Ok(repo.delete_add_on(tenant, id).await?)
}

async fn ensure_service_link<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    service: ServiceId,
) -> AppResult<()> {
    repo.get_service(tenant, service)
        .await
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("Service {} does not exist", service)))
}
