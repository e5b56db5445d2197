//! Reservations and the resource occupancy invariant.
//!
//! No two active reservations (see [`ReservationStatus::ACTIVE`]) may hold the
//! same resource over overlapping windows. Implementations enforce this inside
//! `create_reservation` and `update_reservation` so concurrent requests cannot
//! both pass a check made outside the write.
//!
//! [`ReservationStatus::ACTIVE`]: crate::models::ReservationStatus::ACTIVE

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    Page, PageRequest, Reservation, ReservationAddOn, ReservationFilter, ReservationId,
    ResourceId, TenantId, TimeWindow,
};

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Active reservations on `resource` whose window overlaps `window`.
    ///
    /// # Arguments
    /// * `exclude` - Reservation to ignore, used when re-checking an update
    async fn find_overlapping_reservations(
        &self,
        tenant: TenantId,
        resource: ResourceId,
        window: TimeWindow,
        exclude: Option<ReservationId>,
    ) -> RepositoryResult<Vec<Reservation>>;

    /// Insert a reservation.
    ///
    /// # Errors
    /// `ConflictError` when the reservation is active, has a resource and an
    /// overlapping active reservation already holds it. Nothing is written.
    async fn create_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation>;

    async fn get_reservation(
        &self,
        tenant: TenantId,
        id: ReservationId,
    ) -> RepositoryResult<Reservation>;

    async fn find_reservation_by_external_id(
        &self,
        tenant: TenantId,
        external_id: &str,
    ) -> RepositoryResult<Option<Reservation>>;

    /// One page of filtered reservations ordered by start date.
    async fn list_reservations(
        &self,
        tenant: TenantId,
        filter: &ReservationFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Reservation>>;

    /// Every reservation matching `filter`, ordered by start date.
    async fn find_reservations(
        &self,
        tenant: TenantId,
        filter: &ReservationFilter,
    ) -> RepositoryResult<Vec<Reservation>>;

    /// Persist every mutable field of `reservation`, re-running the overlap
    /// check (excluding itself) when it is active and holds a resource.
    ///
    /// # Errors
    /// `ConflictError` on overlap, `NotFound` if the reservation is gone.
    async fn update_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation>;

    /// Remove a reservation and its add-ons.
    async fn delete_reservation(&self, tenant: TenantId, id: ReservationId)
        -> RepositoryResult<()>;

    async fn add_reservation_add_on(
        &self,
        add_on: ReservationAddOn,
    ) -> RepositoryResult<ReservationAddOn>;

    async fn list_reservation_add_ons(
        &self,
        tenant: TenantId,
        reservation: ReservationId,
    ) -> RepositoryResult<Vec<ReservationAddOn>>;
}
