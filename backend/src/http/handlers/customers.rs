//! Customers and their pets (customer service).

use axum::extract::State;

use super::{CreatedResult, HandlerResult};
use crate::http::dto::{ApiResponse, CustomerQuery, Deleted, DeleteQuery, ListData, PetQuery};
use crate::http::extract::{ApiJson, ApiPath, ApiQuery, CurrentTenant};
use crate::http::state::AppState;
use crate::models::{
    CreateCustomer, CreatePet, Customer, CustomerId, Pet, PetId, UpdateCustomer, UpdatePet,
};
use crate::services::{customers, DeleteMode};

// =============================================================================
// Customers
// =============================================================================

/// GET /customers?search=&isActive=&page=&limit=
pub async fn list_customers(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<CustomerQuery>,
) -> HandlerResult<ListData<Customer>> {
    let page = customers::list_customers(
        state.repository.as_ref(),
        tenant.id,
        &query.filter(),
        query.page_request(),
    )
    .await?;
    Ok(ApiResponse::page("customers", page))
}

pub async fn get_customer(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<CustomerId>,
) -> HandlerResult<Customer> {
    let customer = customers::get_customer(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreateCustomer>,
) -> CreatedResult<Customer> {
    let customer = customers::create_customer(state.repository.as_ref(), &tenant, request).await?;
    Ok(ApiResponse::created(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<CustomerId>,
    ApiJson(patch): ApiJson<UpdateCustomer>,
) -> HandlerResult<Customer> {
    let customer =
        customers::update_customer(state.repository.as_ref(), tenant.id, id, patch).await?;
    Ok(ApiResponse::ok(customer))
}

/// DELETE /customers/{id}?permanent=true
///
/// Soft delete by default: the customer is deactivated and keeps its history.
pub async fn delete_customer(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<CustomerId>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> HandlerResult<Deleted> {
    let permanent = query.permanent.unwrap_or(false);
    customers::delete_customer(
        state.repository.as_ref(),
        tenant.id,
        id,
        DeleteMode::from_flag(permanent),
    )
    .await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent,
    }))
}

pub async fn list_customer_pets(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<CustomerId>,
) -> HandlerResult<ListData<Pet>> {
    let pets = customers::list_customer_pets(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::list("pets", pets))
}

// =============================================================================
// Pets
// =============================================================================

pub async fn list_pets(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<PetQuery>,
) -> HandlerResult<ListData<Pet>> {
    let pets = customers::list_pets(state.repository.as_ref(), tenant.id, &query.into()).await?;
    Ok(ApiResponse::list("pets", pets))
}

pub async fn get_pet(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<PetId>,
) -> HandlerResult<Pet> {
    let pet = customers::get_pet(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(pet))
}

pub async fn create_pet(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreatePet>,
) -> CreatedResult<Pet> {
    let pet = customers::create_pet(state.repository.as_ref(), tenant.id, request).await?;
    Ok(ApiResponse::created(pet))
}

pub async fn update_pet(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<PetId>,
    ApiJson(patch): ApiJson<UpdatePet>,
) -> HandlerResult<Pet> {
    let pet = customers::update_pet(state.repository.as_ref(), tenant.id, id, patch).await?;
    Ok(ApiResponse::ok(pet))
}

pub async fn delete_pet(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<PetId>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> HandlerResult<Deleted> {
    let permanent = query.permanent.unwrap_or(false);
    customers::delete_pet(
        state.repository.as_ref(),
        tenant.id,
        id,
        DeleteMode::from_flag(permanent),
    )
    .await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent,
    }))
}
