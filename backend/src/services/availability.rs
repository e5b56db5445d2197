//! Resource availability.
//!
//! A resource is unavailable for a window when an active reservation on it
//! overlaps the window (`start < queryEnd && end > queryStart`).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::repository::{FullRepository, RepositoryError};
use crate::error::{AppError, AppResult};
use crate::models::{
    parse_date, parse_timestamp, Reservation, ReservationFilter, ReservationId, ReservationStatus,
    Resource, ResourceFilter, ResourceId, ResourceType, TenantId, TimeWindow,
};

/// Upper bound on resource ids in one batch request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Window parameters shared by the single, batch and free-resource queries.
///
/// Either `date` (one calendar day) or both `startDate` and `endDate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl WindowQuery {
    pub fn window(&self) -> AppResult<TimeWindow> {
        if let Some(date) = non_blank(&self.date) {
            let day = parse_date(date).map_err(AppError::validation)?;
            return Ok(TimeWindow::for_day(day));
        }
        match (non_blank(&self.start_date), non_blank(&self.end_date)) {
            (Some(start), Some(end)) => {
                let start = parse_timestamp(start).map_err(AppError::validation)?;
                let end = parse_timestamp(end).map_err(AppError::validation)?;
                super::validation::window(start, end)
            }
            _ => Err(AppError::validation(
                "Either date or both startDate and endDate are required",
            )),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    #[serde(alias = "kennelId")]
    pub resource_id: Option<ResourceId>,
    #[serde(flatten)]
    pub window: WindowQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAvailabilityRequest {
    #[serde(alias = "kennelIds")]
    pub resource_ids: Vec<ResourceId>,
    #[serde(flatten)]
    pub window: WindowQuery,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableResourcesQuery {
    #[serde(flatten)]
    pub window: WindowQuery,
    #[serde(default, rename = "type", alias = "resourceType")]
    pub resource_type: Option<ResourceType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingReservation {
    pub id: ReservationId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl From<&Reservation> for ConflictingReservation {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id,
            start_date: r.start_date,
            end_date: r.end_date,
            status: r.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub resource_id: ResourceId,
    pub is_available: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub conflicting_reservations: Vec<ConflictingReservation>,
}

/// One row of a batch answer; unknown ids are reported instead of failing the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchAvailabilityEntry {
    Checked(Availability),
    #[serde(rename_all = "camelCase")]
    Failed { resource_id: ResourceId, error: String },
}

pub async fn check_availability<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    resource: ResourceId,
    window: TimeWindow,
) -> AppResult<Availability> {
    repo.get_resource(tenant, resource).await?;
    let conflicts = repo
        .find_overlapping_reservations(tenant, resource, window, None)
        .await?;
    Ok(Availability {
        resource_id: resource,
        is_available: conflicts.is_empty(),
        start_date: window.start,
        end_date: window.end,
        conflicting_reservations: conflicts.iter().map(ConflictingReservation::from).collect(),
    })
}

pub async fn check_query<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    query: &AvailabilityQuery,
) -> AppResult<Availability> {
    let resource = query
        .resource_id
        .ok_or_else(|| AppError::validation("resourceId is required"))?;
    check_availability(repo, tenant, resource, query.window.window()?).await
}

pub async fn check_batch<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    request: &BatchAvailabilityRequest,
) -> AppResult<Vec<BatchAvailabilityEntry>> {
    if request.resource_ids.is_empty() {
        return Err(AppError::validation("resourceIds must not be empty"));
    }
    if request.resource_ids.len() > MAX_BATCH_SIZE {
        return Err(AppError::validation(format!(
            "At most {} resources can be checked at once",
            MAX_BATCH_SIZE
        )));
    }
    let window = request.window.window()?;

    let mut entries = Vec::with_capacity(request.resource_ids.len());
    for &resource in &request.resource_ids {
        let entry = match check_availability(repo, tenant, resource, window).await {
            Ok(availability) => BatchAvailabilityEntry::Checked(availability),
            Err(e) if e.status == 404 => BatchAvailabilityEntry::Failed {
                resource_id: resource,
                error: e.message,
            },
            Err(e) => return Err(e),
        };
        entries.push(entry);
    }
    Ok(entries)
}

/// Active resources with no blocking reservation in `window`.
pub async fn available_resources<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    window: TimeWindow,
    resource_type: Option<ResourceType>,
) -> AppResult<Vec<Resource>> {
    let resources = repo
        .list_resources(
            tenant,
            &ResourceFilter {
                resource_type,
                is_active: Some(true),
                search: None,
            },
        )
        .await?;
    let occupied = occupied_resources(repo, tenant, window).await?;
    Ok(resources
        .into_iter()
        .filter(|r| !occupied.contains(&r.id))
        .collect())
}

/// Ids of resources held by an active reservation overlapping `window`.
pub async fn occupied_resources<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    window: TimeWindow,
) -> Result<HashSet<ResourceId>, RepositoryError> {
    let filter = ReservationFilter {
        window: Some(window),
        ..Default::default()
    };
    Ok(repo
        .find_reservations(tenant, &filter)
        .await?
        .iter()
        .filter(|r| r.status.is_active())
        .filter_map(|r| r.resource_id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{
        CustomerRepository, ReservationRepository, ResourceRepository, TenantRepository,
    };
    use crate::models::{
        CreateCustomer, CreatePet, CreateResource, CreateService, CustomerId, PetId, PetType,
        ServiceCategory, ServiceId,
    };

    struct Fixture {
        repo: LocalRepository,
        tenant: TenantId,
        customer: CustomerId,
        pet: PetId,
        service: ServiceId,
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
        let pet = repo
            .create_pet(
                CreatePet {
                    customer_id: customer.id,
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
                .into_pet(tenant),
            )
            .await
            .unwrap();
        let service = repo
            .create_service(
                CreateService {
                    name: "Boarding".into(),
                    description: None,
                    service_category: ServiceCategory::Boarding,
                    price: 40.0,
                    duration_minutes: None,
                }
                .into_service(tenant),
            )
            .await
            .unwrap();
        Fixture {
            repo,
            tenant,
            customer: customer.id,
            pet: pet.id,
            service: service.id,
        }
    }

    async fn kennel(f: &Fixture, name: &str) -> ResourceId {
        let resource = CreateResource {
            name: name.into(),
            resource_type: ResourceType::Standard,
            suite_number: None,
            description: None,
            capacity: 1,
        };
        f.repo
            .create_resource(resource.into_resource(f.tenant))
            .await
            .unwrap()
            .id
    }

    async fn book(f: &Fixture, resource: ResourceId, start: &str, end: &str, status: ReservationStatus) {
        let now = Utc::now();
        f.repo
            .create_reservation(Reservation {
                id: ReservationId::generate(),
                tenant_id: f.tenant,
                customer_id: f.customer,
                pet_id: f.pet,
                service_id: f.service,
                resource_id: Some(resource),
                start_date: parse_timestamp(start).unwrap(),
                end_date: parse_timestamp(end).unwrap(),
                status,
                price: 0.0,
                notes: None,
                staff_notes: None,
                external_id: None,
                check_in_at: None,
                check_out_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    fn range(start: &str, end: &str) -> WindowQuery {
        WindowQuery {
            date: None,
            start_date: Some(start.into()),
            end_date: Some(end.into()),
        }
    }

    #[test]
    fn test_window_query_forms() {
        let day = WindowQuery {
            date: Some("2024-06-01".into()),
            ..Default::default()
        }
        .window()
        .unwrap();
        assert_eq!(day.nights(), 1);

        assert_eq!(WindowQuery::default().window().unwrap_err().status, 400);
        assert_eq!(range("2024-06-03", "2024-06-01").window().unwrap_err().status, 400);
        assert_eq!(range("yesterday", "2024-06-01").window().unwrap_err().status, 400);
    }

    #[tokio::test]
    async fn test_overlap_makes_resource_unavailable() {
        let f = fixture().await;
        let a1 = kennel(&f, "A1").await;
        book(&f, a1, "2024-06-01", "2024-06-05", ReservationStatus::Confirmed).await;

        let busy = check_availability(&f.repo, f.tenant, a1, range("2024-06-04", "2024-06-06").window().unwrap())
            .await
            .unwrap();
        assert!(!busy.is_available);
        assert_eq!(busy.conflicting_reservations.len(), 1);

        // Touching windows do not overlap.
        let free = check_availability(&f.repo, f.tenant, a1, range("2024-06-05", "2024-06-07").window().unwrap())
            .await
            .unwrap();
        assert!(free.is_available);
    }

    #[tokio::test]
    async fn test_cancelled_reservations_do_not_block() {
        let f = fixture().await;
        let a1 = kennel(&f, "A1").await;
        book(&f, a1, "2024-06-01", "2024-06-05", ReservationStatus::Cancelled).await;
        let window = range("2024-06-02", "2024-06-03").window().unwrap();
        assert!(check_availability(&f.repo, f.tenant, a1, window).await.unwrap().is_available);
        assert_eq!(available_resources(&f.repo, f.tenant, window, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_reports_unknown_ids_inline() {
        let f = fixture().await;
        let a1 = kennel(&f, "A1").await;
        let a2 = kennel(&f, "A2").await;
        book(&f, a2, "2024-06-01", "2024-06-05", ReservationStatus::Pending).await;
        let unknown = ResourceId::generate();

        let request = BatchAvailabilityRequest {
            resource_ids: vec![a1, a2, unknown],
            window: WindowQuery {
                date: Some("2024-06-02".into()),
                ..Default::default()
            },
        };
        let entries = check_batch(&f.repo, f.tenant, &request).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], BatchAvailabilityEntry::Checked(a) if a.is_available));
        assert!(matches!(&entries[1], BatchAvailabilityEntry::Checked(a) if !a.is_available));
        assert!(matches!(&entries[2], BatchAvailabilityEntry::Failed { resource_id, .. } if *resource_id == unknown));

        let free = available_resources(&f.repo, f.tenant, request.window.window().unwrap(), None)
            .await
            .unwrap();
        assert_eq!(free.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a1]);
    }

    #[tokio::test]
    async fn test_unknown_resource_is_not_found() {
        let f = fixture().await;
        let window = range("2024-06-01", "2024-06-02").window().unwrap();
        let err = check_availability(&f.repo, f.tenant, ResourceId::generate(), window)
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);
    }
}
