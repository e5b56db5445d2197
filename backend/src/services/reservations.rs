//! Reservation booking, lifecycle and add-ons.
//!
//! Overlap protection lives in the repository: the check and the write happen
//! under one lock (local) or one transaction holding the resource row
//! (Postgres). This module turns the resulting conflict into the booking
//! error the API exposes and prices stays from the catalog.

use std::collections::HashMap;

use chrono::Utc;

use super::validation;
use crate::db::repository::{FullRepository, RepositoryError};
use crate::error::{AppError, AppResult};
use crate::models::{
    round_currency, CustomerId, CustomerSummary, NewReservation, NewReservationAddOn, Page, PageRequest,
    PetId, PetSummary, Reservation, ReservationAddOn, ReservationAddOnId, ReservationDetails,
    ReservationFilter, ReservationId, ReservationStatus, ResourceId, ResourceSummary, Service,
    ServiceId, ServiceSummary, StatusChange, TenantId, TimeWindow, UpdateReservation,
};

/// Catalog price for `service` over `window`: boarding per night (at least
/// one), everything else per visit.
pub fn quote(service: &Service, window: &TimeWindow) -> f64 {
    if service.service_category.is_nightly() {
        round_currency(service.price * window.nights() as f64)
    } else {
        round_currency(service.price)
    }
}

pub async fn create_reservation<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    request: NewReservation,
) -> AppResult<ReservationDetails> {
    let window = validation::window(request.start_date, request.end_date)?;
    let status = request.status.unwrap_or(ReservationStatus::Pending);
    if !status.is_active() {
        return Err(AppError::validation(format!(
            "A new reservation cannot start in status {}",
            status
        )));
    }
    if let Some(price) = request.price {
        validation::non_negative(price, "price")?;
    }

    let customer = repo.get_customer(tenant, request.customer_id).await?;
    let pet = repo.get_pet(tenant, request.pet_id).await?;
    if pet.customer_id != customer.id {
        return Err(AppError::validation(format!(
            "Pet {} does not belong to customer {}",
            pet.id, customer.id
        )));
    }
    let service = active_service(repo, tenant, request.service_id).await?;
    if let Some(resource) = request.resource_id {
        ensure_active_resource(repo, tenant, resource).await?;
    }

    let external_id = request
        .external_id
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(ext) = &external_id {
        if repo.find_reservation_by_external_id(tenant, ext).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Reservation with external id '{}' already exists",
                ext
            )));
        }
    }

    let now = Utc::now();
    let reservation = Reservation {
        id: ReservationId::generate(),
        tenant_id: tenant,
        customer_id: customer.id,
        pet_id: pet.id,
        service_id: service.id,
        resource_id: request.resource_id,
        start_date: window.start,
        end_date: window.end,
        status,
        price: request
            .price
            .map(round_currency)
            .unwrap_or_else(|| quote(&service, &window)),
        notes: request.notes,
        staff_notes: request.staff_notes,
        external_id,
        check_in_at: (status == ReservationStatus::CheckedIn).then_some(now),
        check_out_at: None,
        created_at: now,
        updated_at: now,
    };

    let created = match repo.create_reservation(reservation).await {
        Ok(r) => r,
        Err(e) => return Err(booking_error(repo, tenant, request.resource_id, window, None, e).await),
    };
    log::info!(
        "Created reservation {} for pet {} ({} to {})",
        created.id,
        created.pet_id,
        created.start_date,
        created.end_date
    );
    enrich(repo, created).await
}

pub async fn get_reservation<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ReservationId,
) -> AppResult<ReservationDetails> {
    let reservation = repo.get_reservation(tenant, id).await?;
    enrich(repo, reservation).await
}

pub async fn list_reservations<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &ReservationFilter,
    page: PageRequest,
) -> AppResult<Page<ReservationDetails>> {
    let page = repo.list_reservations(tenant, filter, page).await?;
    let mut lookup = Lookup::new(tenant);
    let mut items = Vec::with_capacity(page.items.len());
    for reservation in page.items {
        items.push(lookup.details(repo, reservation).await?);
    }
    Ok(Page {
        items,
        pagination: page.pagination,
    })
}

pub async fn update_reservation<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ReservationId,
    patch: UpdateReservation,
) -> AppResult<ReservationDetails> {
    let mut reservation = repo.get_reservation(tenant, id).await?;
    if reservation.status.is_terminal() {
        return Err(AppError::validation(format!(
            "Cannot modify a {} reservation",
            reservation.status
        )));
    }
    if let Some(price) = patch.price {
        validation::non_negative(price, "price")?;
    }
    if let Some(service) = patch.service_id {
        active_service(repo, tenant, service).await?;
    }
    if let Some(Some(resource)) = patch.resource_id {
        ensure_active_resource(repo, tenant, resource).await?;
    }

    let reprice = patch.price.is_none()
        && (patch.service_id.is_some() || patch.start_date.is_some() || patch.end_date.is_some());
    patch.apply(&mut reservation);
    let window = validation::window(reservation.start_date, reservation.end_date)?;
    if reprice {
        let service = repo.get_service(tenant, reservation.service_id).await?;
        reservation.price = quote(&service, &window);
    }

    let resource = reservation.resource_id;
    match repo.update_reservation(reservation).await {
        Ok(updated) => enrich(repo, updated).await,
        Err(e) => Err(booking_error(repo, tenant, resource, window, Some(id), e).await),
    }
}

/// Move a reservation along its lifecycle, stamping check-in/out times.
pub async fn change_status<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ReservationId,
    change: StatusChange,
) -> AppResult<ReservationDetails> {
    let mut reservation = repo.get_reservation(tenant, id).await?;
    let from = reservation.status;
    if !from.can_transition_to(change.status) {
        return Err(AppError::validation(format!(
            "Cannot change reservation status from {} to {}",
            from, change.status
        ))
        .with_details(serde_json::json!({
            "currentStatus": from,
            "allowed": from.allowed_transitions(),
        })));
    }

    let now = Utc::now();
    reservation.status = change.status;
    match change.status {
        ReservationStatus::CheckedIn => reservation.check_in_at = Some(now),
        ReservationStatus::CheckedOut => reservation.check_out_at = Some(now),
        _ => {}
    }
    reservation.updated_at = now;

    let (resource, window) = (reservation.resource_id, reservation.window());
    let updated = match repo.update_reservation(reservation).await {
        Ok(r) => r,
        Err(e) => return Err(booking_error(repo, tenant, resource, window, Some(id), e).await),
    };
    log::info!("Reservation {} moved from {} to {}", id, from, updated.status);
    enrich(repo, updated).await
}

pub async fn delete_reservation<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ReservationId,
) -> AppResult<()> {
    Ok(repo.delete_reservation(tenant, id).await?)
}

pub async fn add_add_on<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    reservation: ReservationId,
    request: NewReservationAddOn,
) -> AppResult<ReservationAddOn> {
    validation::positive(request.quantity, "quantity")?;
    let reservation = repo.get_reservation(tenant, reservation).await?;
    if reservation.status.is_terminal() {
        return Err(AppError::validation(format!(
            "Cannot add services to a {} reservation",
            reservation.status
        )));
    }
    let add_on = repo.get_add_on(tenant, request.add_on_id).await?;
    if !add_on.is_active {
        return Err(AppError::validation(format!("Add-on '{}' is not active", add_on.name)));
    }
    if let Some(linked) = add_on.service_id {
        if linked != reservation.service_id {
            return Err(AppError::validation(format!(
                "Add-on '{}' is not offered with this reservation's service",
                add_on.name
            )));
        }
    }

    let line = ReservationAddOn {
        id: ReservationAddOnId::generate(),
        tenant_id: tenant,
        reservation_id: reservation.id,
        add_on_id: add_on.id,
        quantity: request.quantity,
        unit_price: add_on.price,
        notes: request.notes,
        created_at: Utc::now(),
    };
    Ok(repo.add_reservation_add_on(line).await?)
}

pub async fn list_add_ons<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    reservation: ReservationId,
) -> AppResult<Vec<ReservationAddOn>> {
    repo.get_reservation(tenant, reservation).await?;
    Ok(repo.list_reservation_add_ons(tenant, reservation).await?)
}

async fn active_service<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ServiceId,
) -> AppResult<Service> {
    let service = repo.get_service(tenant, id).await?;
    if !service.is_active {
        return Err(AppError::validation(format!("Service '{}' is not active", service.name)));
    }
    Ok(service)
}

async fn ensure_active_resource<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ResourceId,
) -> AppResult<()> {
    let resource = repo.get_resource(tenant, id).await?;
    if !resource.is_active {
        return Err(AppError::validation(format!("Resource '{}' is not active", resource.name)));
    }
    Ok(())
}

/// Overlap conflicts become a 400 `RESOURCE_CONFLICT` listing the blocking
/// reservations; other repository errors map as usual.
async fn booking_error<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    resource: Option<ResourceId>,
    window: TimeWindow,
    exclude: Option<ReservationId>,
    error: RepositoryError,
) -> AppError {
    let (message, resource) = match (&error, resource) {
        (RepositoryError::ConflictError { message, .. }, Some(resource)) => (message.clone(), resource),
        _ => return error.into(),
    };
    let blocking: Vec<ReservationId> = repo
        .find_overlapping_reservations(tenant, resource, window, exclude)
        .await
        .map(|rs| rs.iter().map(|r| r.id).collect())
        .unwrap_or_default();
    log::warn!("Booking conflict on resource {}: {}", resource, message);
    AppError::booking_conflict(message).with_details(serde_json::json!({
        "resourceId": resource,
        "startDate": window.start,
        "endDate": window.end,
        "conflictingReservations": blocking,
    }))
}

async fn enrich<R: FullRepository + ?Sized>(
    repo: &R,
    reservation: Reservation,
) -> AppResult<ReservationDetails> {
    Lookup::new(reservation.tenant_id).details(repo, reservation).await
}

/// Per-request cache of the summaries embedded in reservation responses.
struct Lookup {
    tenant: TenantId,
    customers: HashMap<CustomerId, Option<CustomerSummary>>,
    pets: HashMap<PetId, Option<PetSummary>>,
    resources: HashMap<ResourceId, Option<ResourceSummary>>,
    services: HashMap<ServiceId, Option<ServiceSummary>>,
}

impl Lookup {
    fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            customers: HashMap::new(),
            pets: HashMap::new(),
            resources: HashMap::new(),
            services: HashMap::new(),
        }
    }

    async fn details<R: FullRepository + ?Sized>(
        &mut self,
        repo: &R,
        reservation: Reservation,
    ) -> AppResult<ReservationDetails> {
        let tenant = self.tenant;

        let key = reservation.customer_id;
        if !self.customers.contains_key(&key) {
            let found = missing_ok(repo.get_customer(tenant, reservation.customer_id).await)?;
            self.customers.insert(key, found.as_ref().map(CustomerSummary::from));
        }
        let customer = self.customers[&key].clone();

        let key = reservation.pet_id;
        if !self.pets.contains_key(&key) {
            let found = missing_ok(repo.get_pet(tenant, reservation.pet_id).await)?;
            self.pets.insert(key, found.as_ref().map(PetSummary::from));
        }
        let pet = self.pets[&key].clone();

        let key = reservation.service_id;
        if !self.services.contains_key(&key) {
            let found = missing_ok(repo.get_service(tenant, reservation.service_id).await)?;
            self.services.insert(key, found.as_ref().map(ServiceSummary::from));
        }
        let service = self.services[&key].clone();

        let resource = match reservation.resource_id {
            Some(id) => {
                let key = id;
                if !self.resources.contains_key(&key) {
                    let found = missing_ok(repo.get_resource(tenant, id).await)?;
                    self.resources.insert(key, found.as_ref().map(ResourceSummary::from));
                }
                self.resources[&key].clone()
            }
            None => None,
        };

        Ok(ReservationDetails {
            reservation,
            customer,
            pet,
            resource,
            service,
        })
    }
}

/// A related record deleted since the booking is rendered as `null`.
fn missing_ok<T>(result: Result<T, RepositoryError>) -> AppResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{
        CustomerRepository, ReservationRepository, ResourceRepository, TenantRepository,
    };
    use crate::models::{
        parse_timestamp, CreateAddOn, CreateCustomer, CreatePet, CreateResource, CreateService,
        PetType, ResourceType, ServiceCategory,
    };

    struct Fixture {
        repo: LocalRepository,
        tenant: TenantId,
        customer: CustomerId,
        pet: PetId,
        boarding: ServiceId,
        grooming: ServiceId,
        suite: ResourceId,
    }

    async fn fixture() -> Fixture {
        let repo = LocalRepository::with_demo_tenant("dev");
        let tenant = repo.get_tenant_by_slug("dev").await.unwrap().id;
        let customer = repo
            .create_customer(
                CreateCustomer {
                    first_name: "Ada".into(),
                    last_name: "Lovelace".into(),
                    ..Default::default()
                }
                .into_customer(tenant),
            )
            .await
            .unwrap();
        let pet = repo.create_pet(pet(customer.id).into_pet(tenant)).await.unwrap();
        let boarding = repo
            .create_service(service("Boarding", ServiceCategory::Boarding, 45.0).into_service(tenant))
            .await
            .unwrap();
        let grooming = repo
            .create_service(service("Bath", ServiceCategory::Grooming, 30.0).into_service(tenant))
            .await
            .unwrap();
        let suite = repo
            .create_resource(
                CreateResource {
                    name: "Suite 1".into(),
                    resource_type: ResourceType::Vip,
                    suite_number: Some(1),
                    description: None,
                    capacity: 1,
                }
                .into_resource(tenant),
            )
            .await
            .unwrap();
        Fixture {
            repo,
            tenant,
            customer: customer.id,
            pet: pet.id,
            boarding: boarding.id,
            grooming: grooming.id,
            suite: suite.id,
        }
    }

    fn pet(owner: CustomerId) -> CreatePet {
        CreatePet {
            customer_id: owner,
            name: "Rex".into(),
            pet_type: PetType::Dog,
            breed: None,
            birthdate: None,
            weight: None,
            medical_notes: None,
            behavior_notes: None,
            allergies: None,
            medications: None,
            pet_icons: vec![],
        }
    }

    fn service(name: &str, category: ServiceCategory, price: f64) -> CreateService {
        CreateService {
            name: name.into(),
            description: None,
            service_category: category,
            price,
            duration_minutes: None,
        }
    }

    fn booking(f: &Fixture, start: &str, end: &str) -> NewReservation {
        NewReservation {
            customer_id: f.customer,
            pet_id: f.pet,
            service_id: f.boarding,
            resource_id: Some(f.suite),
            start_date: parse_timestamp(start).unwrap(),
            end_date: parse_timestamp(end).unwrap(),
            status: None,
            price: None,
            notes: None,
            staff_notes: None,
            external_id: None,
        }
    }

    #[tokio::test]
    async fn test_boarding_priced_per_night() {
        let f = fixture().await;
        let created = create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-01T14:00:00Z", "2024-06-04T11:00:00Z"))
            .await
            .unwrap();
        assert_eq!(created.reservation.price, 135.0);
        assert_eq!(created.reservation.status, ReservationStatus::Pending);
        assert_eq!(created.resource.as_ref().map(|r| r.id), Some(f.suite));
        assert_eq!(created.pet.as_ref().map(|p| p.name.as_str()), Some("Rex"));

        let mut visit = booking(&f, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z");
        visit.service_id = f.grooming;
        visit.resource_id = None;
        let created = create_reservation(&f.repo, f.tenant, visit).await.unwrap();
        assert_eq!(created.reservation.price, 30.0);
    }

    #[tokio::test]
    async fn test_overlap_is_booking_conflict_and_persists_nothing() {
        let f = fixture().await;
        create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-01", "2024-06-05"))
            .await
            .unwrap();
        let before = f.repo.reservation_count();

        let err = create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-04", "2024-06-08"))
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.error_type.as_str(), "RESOURCE_CONFLICT");
        assert_eq!(f.repo.reservation_count(), before);

        // Back-to-back stays share the suite.
        create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-05", "2024-06-07"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pet_of_another_customer_rejected() {
        let f = fixture().await;
        let other = f
            .repo
            .create_customer(
                CreateCustomer {
                    first_name: "Bo".into(),
                    last_name: "Peep".into(),
                    ..Default::default()
                }
                .into_customer(f.tenant),
            )
            .await
            .unwrap();
        let mut request = booking(&f, "2024-06-01", "2024-06-02");
        request.customer_id = other.id;
        assert_eq!(create_reservation(&f.repo, f.tenant, request).await.unwrap_err().status, 400);
    }

    #[tokio::test]
    async fn test_duplicate_external_id_conflicts() {
        let f = fixture().await;
        let mut first = booking(&f, "2024-06-01", "2024-06-02");
        first.external_id = Some("legacy-1".into());
        create_reservation(&f.repo, f.tenant, first).await.unwrap();

        let mut second = booking(&f, "2024-08-01", "2024-08-02");
        second.external_id = Some("legacy-1".into());
        assert_eq!(create_reservation(&f.repo, f.tenant, second).await.unwrap_err().status, 409);
    }

    #[tokio::test]
    async fn test_status_lifecycle_and_stamps() {
        let f = fixture().await;
        let r = create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-01", "2024-06-03"))
            .await
            .unwrap()
            .reservation;

        let err = change_status(&f.repo, f.tenant, r.id, StatusChange { status: ReservationStatus::Completed })
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);

        let checked_in = change_status(&f.repo, f.tenant, r.id, StatusChange { status: ReservationStatus::CheckedIn })
            .await
            .unwrap();
        assert!(checked_in.reservation.check_in_at.is_some());
        let out = change_status(&f.repo, f.tenant, r.id, StatusChange { status: ReservationStatus::CheckedOut })
            .await
            .unwrap();
        assert!(out.reservation.check_out_at.is_some());

        // The suite is free again once the pet has left.
        create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-02", "2024-06-04"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_reprices_and_rechecks() {
        let f = fixture().await;
        let a = create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-01", "2024-06-03"))
            .await
            .unwrap()
            .reservation;
        create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-10", "2024-06-12"))
            .await
            .unwrap();

        let longer = UpdateReservation {
            end_date: Some(parse_timestamp("2024-06-05").unwrap()),
            ..Default::default()
        };
        let updated = update_reservation(&f.repo, f.tenant, a.id, longer).await.unwrap();
        assert_eq!(updated.reservation.price, 180.0);

        let clash = UpdateReservation {
            end_date: Some(parse_timestamp("2024-06-11").unwrap()),
            ..Default::default()
        };
        let err = update_reservation(&f.repo, f.tenant, a.id, clash).await.unwrap_err();
        assert_eq!(err.status, 400);
        let unchanged = f.repo.get_reservation(f.tenant, a.id).await.unwrap();
        assert_eq!(unchanged.end_date, parse_timestamp("2024-06-05").unwrap());
    }

    #[tokio::test]
    async fn test_add_on_price_captured_and_service_link_checked() {
        let f = fixture().await;
        let r = create_reservation(&f.repo, f.tenant, booking(&f, "2024-06-01", "2024-06-03"))
            .await
            .unwrap()
            .reservation;
        let walk = f
            .repo
            .create_add_on(
                CreateAddOn {
                    service_id: Some(f.boarding),
                    name: "Extra walk".into(),
                    description: None,
                    price: 8.5,
                }
                .into_add_on(f.tenant),
            )
            .await
            .unwrap();
        let nails = f
            .repo
            .create_add_on(
                CreateAddOn {
                    service_id: Some(f.grooming),
                    name: "Nail trim".into(),
                    description: None,
                    price: 12.0,
                }
                .into_add_on(f.tenant),
            )
            .await
            .unwrap();

        let line = add_add_on(
            &f.repo,
            f.tenant,
            r.id,
            NewReservationAddOn {
                add_on_id: walk.id,
                quantity: 2,
                notes: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(line.line_total(), 17.0);

        let err = add_add_on(
            &f.repo,
            f.tenant,
            r.id,
            NewReservationAddOn {
                add_on_id: nails.id,
                quantity: 1,
                notes: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(list_add_ons(&f.repo, f.tenant, r.id).await.unwrap().len(), 1);
    }
}
