//! Reservation CRUD, status changes and attached add-ons.

use axum::extract::State;

use super::{CreatedResult, HandlerResult};
use crate::http::dto::{ApiResponse, Deleted, ListData, ReservationQuery};
use crate::http::extract::{ApiJson, ApiPath, ApiQuery, CurrentTenant};
use crate::http::state::AppState;
use crate::models::{
    NewReservation, NewReservationAddOn, ReservationAddOn, ReservationDetails, ReservationId,
    StatusChange, UpdateReservation,
};
use crate::services::reservations;

/// GET /reservations?status=&customerId=&petId=&resourceId=&startDate=&endDate=&page=&limit=
pub async fn list_reservations(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<ReservationQuery>,
) -> HandlerResult<ListData<ReservationDetails>> {
    let page = reservations::list_reservations(
        state.repository.as_ref(),
        tenant.id,
        &query.filter()?,
        query.page_request(),
    )
    .await?;
    Ok(ApiResponse::page("reservations", page))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ReservationId>,
) -> HandlerResult<ReservationDetails> {
    Ok(ApiResponse::ok(
        reservations::get_reservation(state.repository.as_ref(), tenant.id, id).await?,
    ))
}

/// POST /reservations
///
/// An overlapping booking on the same resource is rejected with
/// `400 RESOURCE_CONFLICT` and nothing is stored.
pub async fn create_reservation(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<NewReservation>,
) -> CreatedResult<ReservationDetails> {
    let created =
        reservations::create_reservation(state.repository.as_ref(), tenant.id, request).await?;
    tracing::info!(
        tenant = %tenant.slug,
        reservation = %created.reservation.id,
        "reservation created"
    );
    Ok(ApiResponse::created(created))
}

pub async fn update_reservation(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ReservationId>,
    ApiJson(patch): ApiJson<UpdateReservation>,
) -> HandlerResult<ReservationDetails> {
    let updated =
        reservations::update_reservation(state.repository.as_ref(), tenant.id, id, patch).await?;
    Ok(ApiResponse::ok(updated))
}

/// PATCH /reservations/{id}/status
pub async fn change_status(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ReservationId>,
    ApiJson(change): ApiJson<StatusChange>,
) -> HandlerResult<ReservationDetails> {
    let updated =
        reservations::change_status(state.repository.as_ref(), tenant.id, id, change).await?;
    Ok(ApiResponse::ok(updated))
}

pub async fn delete_reservation(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ReservationId>,
) -> HandlerResult<Deleted> {
    reservations::delete_reservation(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent: true,
    }))
}

// =============================================================================
// Reservation add-ons
// =============================================================================

pub async fn list_reservation_add_ons(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ReservationId>,
) -> HandlerResult<ListData<ReservationAddOn>> {
    let add_ons = reservations::list_add_ons(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::list("addOns", add_ons))
}

pub async fn add_reservation_add_on(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ReservationId>,
    ApiJson(request): ApiJson<NewReservationAddOn>,
) -> CreatedResult<ReservationAddOn> {
    let add_on =
        reservations::add_add_on(state.repository.as_ref(), tenant.id, id, request).await?;
    Ok(ApiResponse::created(add_on))
}
