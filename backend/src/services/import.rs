//! Background import of reservations from another system.
//!
//! Items are shaped like a create request plus an `externalId`. Each item is
//! created independently: already-imported external ids are skipped and
//! conflicts or invalid items are logged against the job without stopping it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::job_tracker::{JobTracker, LogLevel};
use super::reservations;
use super::tenants::require_feature;
use crate::db::repository::FullRepository;
use crate::error::{AppError, AppResult};
use crate::models::{features, NewReservation, Tenant, TenantId};

pub const JOB_KIND: &str = "reservation-import";
pub const MAX_IMPORT_ITEMS: usize = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Raw items, parsed one by one so a malformed entry only fails itself.
    pub reservations: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Validate the request, register a job and run the import on the runtime.
///
/// Returns the job id immediately.
pub fn start_import(
    repo: Arc<dyn FullRepository>,
    tracker: JobTracker,
    tenant: &Tenant,
    request: ImportRequest,
) -> AppResult<String> {
    require_feature(tenant, features::IMPORT)?;
    if request.reservations.is_empty() {
        return Err(AppError::validation("reservations must not be empty"));
    }
    if request.reservations.len() > MAX_IMPORT_ITEMS {
        return Err(AppError::validation(format!(
            "At most {} reservations can be imported per job",
            MAX_IMPORT_ITEMS
        )));
    }

    let job_id = tracker.create_job(tenant.id, JOB_KIND);
    tracker.log(
        &job_id,
        LogLevel::Info,
        format!("Importing {} reservations", request.reservations.len()),
    );

    let tenant_id = tenant.id;
    let spawned_id = job_id.clone();
    tokio::spawn(async move {
        run_import(repo.as_ref(), &tracker, &spawned_id, tenant_id, request.reservations).await;
    });
    Ok(job_id)
}

/// Import every item, recording progress and the final summary on the job.
pub async fn run_import<R: FullRepository + ?Sized>(
    repo: &R,
    tracker: &JobTracker,
    job_id: &str,
    tenant: TenantId,
    items: Vec<serde_json::Value>,
) -> ImportSummary {
    let mut summary = ImportSummary {
        total: items.len(),
        ..Default::default()
    };

    for (index, raw) in items.into_iter().enumerate() {
        let item: NewReservation = match serde_json::from_value(raw) {
            Ok(item) => item,
            Err(e) => {
                summary.failed += 1;
                tracker.log(job_id, LogLevel::Error, format!("Item {}: invalid: {}", index, e));
                continue;
            }
        };
        let label = item
            .external_id
            .clone()
            .unwrap_or_else(|| format!("#{}", index));

        if let Some(external) = item.external_id.as_deref() {
            match repo.find_reservation_by_external_id(tenant, external).await {
                Ok(Some(_)) => {
                    summary.skipped += 1;
                    tracker.log(job_id, LogLevel::Info, format!("{}: already imported, skipped", label));
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    let e = AppError::from(e);
                    abort(tracker, job_id, &summary, &e);
                    return summary;
                }
            }
        }

        match reservations::create_reservation(repo, tenant, item).await {
            Ok(created) => {
                summary.created += 1;
                tracker.log(
                    job_id,
                    LogLevel::Success,
                    format!("{}: created reservation {}", label, created.reservation.id),
                );
            }
            Err(e) if e.is_server_error() => {
                abort(tracker, job_id, &summary, &e);
                return summary;
            }
            Err(e) => {
                summary.failed += 1;
                tracker.log(job_id, LogLevel::Warning, format!("{}: {}", label, e.message));
            }
        }
    }

    log::info!(
        "Import job {} finished: {} created, {} skipped, {} failed",
        job_id,
        summary.created,
        summary.skipped,
        summary.failed
    );
    tracker.log(
        job_id,
        LogLevel::Success,
        format!(
            "Done: {} created, {} skipped, {} failed",
            summary.created, summary.skipped, summary.failed
        ),
    );
    tracker.complete_job(job_id, serde_json::to_value(summary).ok());
    summary
}

fn abort(tracker: &JobTracker, job_id: &str, summary: &ImportSummary, error: &AppError) {
    log::error!("Import job {} aborted: {}", job_id, error);
    tracker.fail_job(
        job_id,
        format!(
            "Import aborted after {} of {} items: {}",
            summary.created + summary.skipped + summary.failed,
            summary.total,
            error.message
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{CustomerRepository, ResourceRepository, TenantRepository};
    use crate::models::{
        CreateCustomer, CreatePet, CreateResource, CreateService, PetType, ResourceType,
        ServiceCategory, SubscriptionTier,
    };
    use crate::services::job_tracker::JobStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_import_skips_known_ids_and_logs_conflicts() {
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
        let kennel = repo
            .create_resource(
                CreateResource {
                    name: "K1".into(),
                    resource_type: ResourceType::Standard,
                    suite_number: None,
                    description: None,
                    capacity: 1,
                }
                .into_resource(tenant),
            )
            .await
            .unwrap();

        let item = |ext: &str, start: &str, end: &str| {
            json!({
                "customerId": customer.id,
                "petId": pet.id,
                "serviceId": service.id,
                "kennelId": kennel.id,
                "startDate": start,
                "endDate": end,
                "externalId": ext,
            })
        };
        let items = vec![
            item("gx-1", "2024-06-01", "2024-06-03"),
            item("gx-1", "2024-07-01", "2024-07-03"),
            item("gx-2", "2024-06-02", "2024-06-04"),
            json!({"petId": "not-a-uuid"}),
            item("gx-3", "2024-06-03", "2024-06-05"),
        ];

        let tracker = JobTracker::new();
        let job = tracker.create_job(tenant, JOB_KIND);
        let summary = run_import(&repo, &tracker, &job, tenant, items).await;
        assert_eq!(
            summary,
            ImportSummary {
                total: 5,
                created: 2,
                skipped: 1,
                failed: 2,
            }
        );

        let job = tracker.get_job(tenant, &job).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.unwrap()["created"], 2);
        assert!(job.logs.iter().any(|l| l.level == LogLevel::Warning));
    }

    #[tokio::test]
    async fn test_start_requires_import_feature() {
        let repo = Arc::new(LocalRepository::with_demo_tenant("dev"));
        let mut tenant = repo.get_tenant_by_slug("dev").await.unwrap();
        tenant.subscription_tier = SubscriptionTier::Professional;
        tenant.features.clear();

        let request = ImportRequest {
            reservations: vec![json!({})],
        };
        let err = start_import(repo.clone(), JobTracker::new(), &tenant, request).unwrap_err();
        assert_eq!(err.status, 403);

        tenant.features.push(features::IMPORT.to_string());
        let empty = ImportRequest { reservations: vec![] };
        assert_eq!(start_import(repo, JobTracker::new(), &tenant, empty).unwrap_err().status, 400);
    }
}
