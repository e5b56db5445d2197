use axum::extract::State;

use super::HandlerResult;
use crate::http::dto::{ApiResponse, DashboardQuery};
use crate::http::extract::{ApiQuery, CurrentTenant};
use crate::http::state::AppState;
use crate::services::availability::WindowQuery;
use crate::services::reports::{self, Dashboard, RevenueReport};

/// GET /reports/dashboard?date=YYYY-MM-DD
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> HandlerResult<Dashboard> {
    let report = reports::dashboard(state.repository.as_ref(), &tenant, query.date()?).await?;
    Ok(ApiResponse::ok(report))
}

/// GET /reports/revenue?startDate=&endDate= (or `date` for one day)
pub async fn revenue(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> HandlerResult<RevenueReport> {
    let report = reports::revenue(state.repository.as_ref(), &tenant, query.window()?).await?;
    Ok(ApiResponse::ok(report))
}
