//! Reservation import jobs and their progress.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;

use super::{CreatedResult, HandlerResult};
use crate::error::AppError;
use crate::http::dto::{ApiResponse, JobAccepted};
use crate::http::extract::{ApiJson, ApiPath, CurrentTenant};
use crate::http::state::AppState;
use crate::services::import::{self, ImportRequest};
use crate::services::job_tracker::{Job, JobStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// POST /reservations/import
///
/// Answers `202 Accepted` with the job id; the import runs in the background.
pub async fn import_reservations(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<ImportRequest>,
) -> CreatedResult<JobAccepted> {
    let count = request.reservations.len();
    let job_id = import::start_import(
        state.repository.clone(),
        state.job_tracker.clone(),
        &tenant,
        request,
    )?;
    tracing::info!(tenant = %tenant.slug, job = %job_id, count, "reservation import started");

    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::ok(JobAccepted {
            job_id,
            message: format!("Importing {} reservations", count),
        }),
    ))
}

/// GET /jobs/{job_id}
pub async fn get_job(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(job_id): ApiPath<String>,
) -> HandlerResult<Job> {
    state
        .job_tracker
        .get_job(tenant.id, &job_id)
        .map(ApiResponse::ok)
        .ok_or_else(|| AppError::entity_not_found("Job", &job_id))
}

/// GET /jobs/{job_id}/logs
///
/// Server-sent events: one `message` per log entry, then a `complete` event
/// carrying the final status and result.
pub async fn stream_job_logs(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(job_id): ApiPath<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.job_tracker.get_job(tenant.id, &job_id).is_none() {
        return Err(AppError::entity_not_found("Job", &job_id));
    }

    let tracker = state.job_tracker.clone();
    let tenant_id = tenant.id;
    let stream = async_stream::stream! {
        let mut sent = 0;
        loop {
            let Some((logs, status)) = tracker.logs_since(&job_id, sent) else {
                break;
            };
            for entry in &logs {
                let data = serde_json::to_string(entry).unwrap_or_default();
                yield Ok(Event::default().data(data));
            }
            sent += logs.len();

            if status != JobStatus::Running {
                let result = tracker.get_job(tenant_id, &job_id).and_then(|job| job.result);
                let done = serde_json::json!({ "status": status, "result": result });
                yield Ok(Event::default().event("complete").data(done.to_string()));
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
