//! Staff members and their shift schedules (customer service).

use axum::extract::State;

use super::{CreatedResult, HandlerResult};
use crate::http::dto::{ApiResponse, Deleted, ListData, ScheduleQuery};
use crate::http::extract::{ApiJson, ApiPath, ApiQuery, CurrentTenant};
use crate::http::state::AppState;
use crate::models::{CreateSchedule, CreateStaff, ScheduleId, Staff, StaffId, StaffSchedule, UpdateStaff};
use crate::services::staff;

pub async fn list_staff(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> HandlerResult<ListData<Staff>> {
    let members = staff::list_staff(state.repository.as_ref(), tenant.id).await?;
    Ok(ApiResponse::list("staff", members))
}

pub async fn get_staff(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<StaffId>,
) -> HandlerResult<Staff> {
    Ok(ApiResponse::ok(
        staff::get_staff(state.repository.as_ref(), tenant.id, id).await?,
    ))
}

pub async fn create_staff(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreateStaff>,
) -> CreatedResult<Staff> {
    let member = staff::create_staff(state.repository.as_ref(), &tenant, request).await?;
    Ok(ApiResponse::created(member))
}

pub async fn update_staff(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<StaffId>,
    ApiJson(patch): ApiJson<UpdateStaff>,
) -> HandlerResult<Staff> {
    let member = staff::update_staff(state.repository.as_ref(), tenant.id, id, patch).await?;
    Ok(ApiResponse::ok(member))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<StaffId>,
) -> HandlerResult<Deleted> {
    staff::delete_staff(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent: true,
    }))
}

// =============================================================================
// Schedules
// =============================================================================

/// GET /schedules?staffId=&startDate=&endDate=
pub async fn list_schedules(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> HandlerResult<ListData<StaffSchedule>> {
    let schedules =
        staff::list_schedules(state.repository.as_ref(), tenant.id, &query.filter()?).await?;
    Ok(ApiResponse::list("schedules", schedules))
}

pub async fn list_staff_schedules(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<StaffId>,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> HandlerResult<ListData<StaffSchedule>> {
    let schedules =
        staff::list_staff_schedules(state.repository.as_ref(), tenant.id, id, query.filter()?)
            .await?;
    Ok(ApiResponse::list("schedules", schedules))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiJson(request): ApiJson<CreateSchedule>,
) -> CreatedResult<StaffSchedule> {
    let schedule = staff::create_schedule(state.repository.as_ref(), tenant.id, request).await?;
    Ok(ApiResponse::created(schedule))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiPath(id): ApiPath<ScheduleId>,
) -> HandlerResult<Deleted> {
    staff::delete_schedule(state.repository.as_ref(), tenant.id, id).await?;
    Ok(ApiResponse::ok(Deleted {
        id: id.to_string(),
        permanent: true,
    }))
}
