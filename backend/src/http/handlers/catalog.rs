//! Resources (kennels and suites), availability, services and add-ons
//! (reservation service).

use axum::extract::State;

use super::{CreatedResult, HandlerResult};
use crate::http::dto::{AddOnQuery, ApiResponse, Deleted, ListData, ResourceQuery, ServiceQuery};
use crate::http::extract::{ApiJson, ApiPath, ApiQuery, CurrentTenant};
use crate::http::state::AppState;
use crate::models::{
    AddOnId, AddOnService, CreateAddOn, CreateResource, CreateService, Resource, ResourceId,
    Service, ServiceId, UpdateAddOn, UpdateResource, UpdateService,
};
use crate::services::availability::{
    self, Availability, AvailabilityQuery, AvailableResourcesQuery, BatchAvailabilityEntry,
    BatchAvailabilityRequest,
};
use crate::services::catalog;

// =============================================================================
// Resources
// =============================================================================

pub async fn list_resources(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<ResourceQuery>,
) -> HandlerResult<ListData<Resource>> {
    let resources =
        catalog::list_resources(state.repository.as_ref(), tenant.id, &query.into()).await?;
    Ok(ApiResponse::list("resources", resources))
}

pub async fn get_resource(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ResourceId>,
) -> HandlerResult<Resource> {
    Ok(ApiResponse::ok(
        catalog::get_resource(state.repository.as_ref(), tenant.id, id).await?,
    ))
}

pub async fn create_resource(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreateResource>,
) -> CreatedResult<Resource> {
    let resource = catalog::create_resource(state.repository.as_ref(), &tenant, request).await?;
    Ok(ApiResponse::created(resource))
}

pub async fn update_resource(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ResourceId>,
    ApiJson(patch): ApiJson<UpdateResource>,
) -> HandlerResult<Resource> {
    let resource =
        catalog::update_resource(state.repository.as_ref(), tenant.id, id, patch).await?;
    Ok(ApiResponse::ok(resource))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ResourceId>,
) -> HandlerResult<Deleted> {
    catalog::delete_resource(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent: true,
    }))
}

// =============================================================================
// Availability
// =============================================================================

/// GET /resources/availability?resourceId=&date= | &startDate=&endDate=
pub async fn check_availability(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> HandlerResult<Availability> {
    let result = availability::check_query(state.repository.as_ref(), tenant.id, &query).await?;
    Ok(ApiResponse::ok(result))
}

/// POST /resources/availability/batch
///
/// Unknown resources are reported per entry instead of failing the batch.
pub async fn check_batch_availability(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<BatchAvailabilityRequest>,
) -> HandlerResult<ListData<BatchAvailabilityEntry>> {
    let results =
        availability::check_batch(state.repository.as_ref(), tenant.id, &request).await?;
    Ok(ApiResponse::list("resources", results))
}

/// GET /resources/available?startDate=&endDate=&type=
pub async fn available_resources(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<AvailableResourcesQuery>,
) -> HandlerResult<ListData<Resource>> {
    let window = query.window.window()?;
    let resources = availability::available_resources(
        state.repository.as_ref(),
        tenant.id,
        window,
        query.resource_type,
    )
    .await?;
    Ok(ApiResponse::list("resources", resources))
}

// =============================================================================
// Services
// =============================================================================

pub async fn list_services(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<ServiceQuery>,
) -> HandlerResult<ListData<Service>> {
    let services =
        catalog::list_services(state.repository.as_ref(), tenant.id, &query.into()).await?;
    Ok(ApiResponse::list("services", services))
}

pub async fn get_service(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ServiceId>,
) -> HandlerResult<Service> {
    Ok(ApiResponse::ok(
        catalog::get_service(state.repository.as_ref(), tenant.id, id).await?,
    ))
}

pub async fn create_service(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreateService>,
) -> CreatedResult<Service> {
    let service = catalog::create_service(state.repository.as_ref(), tenant.id, request).await?;
    Ok(ApiResponse::created(service))
}

pub async fn update_service(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ServiceId>,
    ApiJson(patch): ApiJson<UpdateService>,
) -> HandlerResult<Service> {
    let service = catalog::update_service(state.repository.as_ref(), tenant.id, id, patch).await?;
    Ok(ApiResponse::ok(service))
}

pub async fn delete_service(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ServiceId>,
) -> HandlerResult<Deleted> {
    catalog::delete_service(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent: true,
    }))
}

// =============================================================================
// Add-ons
// =============================================================================

pub async fn list_add_ons(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<AddOnQuery>,
) -> HandlerResult<ListData<AddOnService>> {
    let add_ons =
        catalog::list_add_ons(state.repository.as_ref(), tenant.id, &query.into()).await?;
    Ok(ApiResponse::list("addOns", add_ons))
}

pub async fn get_add_on(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<AddOnId>,
) -> HandlerResult<AddOnService> {
    Ok(ApiResponse::ok(
        catalog::get_add_on(state.repository.as_ref(), tenant.id, id).await?,
    ))
}

pub async fn create_add_on(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreateAddOn>,
) -> CreatedResult<AddOnService> {
    let add_on = catalog::create_add_on(state.repository.as_ref(), tenant.id, request).await?;
    Ok(ApiResponse::created(add_on))
}

pub async fn update_add_on(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<AddOnId>,
    ApiJson(patch): ApiJson<UpdateAddOn>,
) -> HandlerResult<AddOnService> {
    let add_on = catalog::update_add_on(state.repository.as_ref(), tenant.id, id, patch).await?;
    Ok(ApiResponse::ok(add_on))
}

pub async fn delete_add_on(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<AddOnId>,
) -> HandlerResult<Deleted> {
    catalog::delete_add_on(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent: true,
    }))
}
