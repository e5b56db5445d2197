//! Request and response shapes that only exist at the HTTP boundary.
//!
//! Domain types from [`crate::models`] are serialized directly; this module
//! adds the success envelope and the query-string structs.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{
    parse_date, parse_timestamp, CustomerFilter, CustomerId, InvoiceFilter, InvoiceId,
    InvoiceStatus, Page, PageRequest, Pagination, PaymentFilter, PaymentMethod, PetFilter, PetType,
    ReservationFilter, ReservationId, ReservationStatus, ResourceFilter, ResourceId, ResourceType,
    ScheduleFilter, ServiceCategory, ServiceFilter, AddOnFilter, ServiceId, StaffId, TimeWindow,
    PetId,
};

/// `{ "status": "success", "data": ..., "pagination"?: ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// List payloads are keyed by the plural entity name, e.g. `{"pets": [...]}`.
pub type ListData<T> = BTreeMap<&'static str, Vec<T>>;

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
            pagination: None,
        }
    }

    /// Wrap the payload in a `201 Created`.
    pub fn created(data: T) -> (StatusCode, Self) {
        (StatusCode::CREATED, Self::ok(data))
    }
}

impl<T> ApiResponse<ListData<T>> {
    pub fn list(key: &'static str, items: Vec<T>) -> Self {
        Self::ok(BTreeMap::from([(key, items)]))
    }

    pub fn page(key: &'static str, page: Page<T>) -> Self {
        let mut response = Self::list(key, page.items);
        response.pagination = Some(page.pagination);
        response
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub id: String,
    pub permanent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: String,
    pub message: String,
}

// =============================================================================
// Query strings
// =============================================================================

/// Optional `startDate` / `endDate` pair. A missing bound leaves that side open.
pub fn optional_window(
    start: Option<&str>,
    end: Option<&str>,
) -> AppResult<Option<TimeWindow>> {
    let parse = |value: &str, field: &str| {
        parse_timestamp(value).map_err(|e| AppError::validation(format!("{}: {}", field, e)))
    };
    let (start, end) = match (start, end) {
        (None, None) => return Ok(None),
        (start, end) => (
            start.map(|s| parse(s, "startDate")).transpose()?,
            end.map(|s| parse(s, "endDate")).transpose()?,
        ),
    };
    let window = TimeWindow::new(
        start.unwrap_or(DateTime::<Utc>::MIN_UTC),
        end.unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
    .ok_or_else(|| AppError::validation("End date must be after start date"))?;
    Ok(Some(window))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub permanent: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CustomerQuery {
    pub fn filter(&self) -> CustomerFilter {
        CustomerFilter {
            search: self.search.clone(),
            is_active: self.is_active,
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetQuery {
    pub customer_id: Option<CustomerId>,
    pub search: Option<String>,
    #[serde(alias = "type")]
    pub pet_type: Option<PetType>,
}

impl From<PetQuery> for PetFilter {
    fn from(q: PetQuery) -> Self {
        PetFilter {
            customer_id: q.customer_id,
            search: q.search,
            pet_type: q.pet_type,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub staff_id: Option<StaffId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ScheduleQuery {
    pub fn filter(&self) -> AppResult<ScheduleFilter> {
        Ok(ScheduleFilter {
            staff_id: self.staff_id,
            window: optional_window(self.start_date.as_deref(), self.end_date.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuery {
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl From<ResourceQuery> for ResourceFilter {
    fn from(q: ResourceQuery) -> Self {
        ResourceFilter {
            resource_type: q.resource_type,
            is_active: q.is_active,
            search: q.search,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    pub category: Option<ServiceCategory>,
    pub is_active: Option<bool>,
}

impl From<ServiceQuery> for ServiceFilter {
    fn from(q: ServiceQuery) -> Self {
        ServiceFilter {
            category: q.category,
            is_active: q.is_active,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOnQuery {
    pub service_id: Option<ServiceId>,
    pub is_active: Option<bool>,
}

impl From<AddOnQuery> for AddOnFilter {
    fn from(q: AddOnQuery) -> Self {
        AddOnFilter {
            service_id: q.service_id,
            is_active: q.is_active,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationQuery {
    pub status: Option<ReservationStatus>,
    pub customer_id: Option<CustomerId>,
    pub pet_id: Option<PetId>,
    #[serde(alias = "kennelId")]
    pub resource_id: Option<ResourceId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ReservationQuery {
    pub fn filter(&self) -> AppResult<ReservationFilter> {
        Ok(ReservationFilter {
            status: self.status,
            customer_id: self.customer_id,
            pet_id: self.pet_id,
            resource_id: self.resource_id,
            window: optional_window(self.start_date.as_deref(), self.end_date.as_deref())?,
        })
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceQuery {
    pub customer_id: Option<CustomerId>,
    pub reservation_id: Option<ReservationId>,
    pub status: Option<InvoiceStatus>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl InvoiceQuery {
    pub fn filter(&self) -> AppResult<InvoiceFilter> {
        Ok(InvoiceFilter {
            customer_id: self.customer_id,
            reservation_id: self.reservation_id,
            status: self.status,
            issued: optional_window(self.start_date.as_deref(), self.end_date.as_deref())?,
        })
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub invoice_id: Option<InvoiceId>,
    pub customer_id: Option<CustomerId>,
    pub method: Option<PaymentMethod>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl PaymentQuery {
    pub fn filter(&self) -> AppResult<PaymentFilter> {
        Ok(PaymentFilter {
            invoice_id: self.invoice_id,
            customer_id: self.customer_id,
            method: self.method,
            paid: optional_window(self.start_date.as_deref(), self.end_date.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub invoice_id: Option<InvoiceId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub since: Option<String>,
    pub limit: Option<usize>,
}

impl UsageQuery {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn since(&self) -> AppResult<Option<DateTime<Utc>>> {
        self.since
            .as_deref()
            .map(|s| parse_timestamp(s).map_err(|e| AppError::validation(format!("since: {}", e))))
            .transpose()
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, 1_000)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<String>,
}

impl DashboardQuery {
    /// Defaults to today (UTC).
    pub fn date(&self) -> AppResult<chrono::NaiveDate> {
        match self.date.as_deref() {
            Some(d) => parse_date(d).map_err(|e| AppError::validation(format!("date: {}", e))),
            None => Ok(Utc::now().date_naive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_envelope_uses_plural_key() {
        let value = serde_json::to_value(ApiResponse::list("pets", vec![1, 2])).unwrap();
        assert_eq!(value, json!({"status": "success", "data": {"pets": [1, 2]}}));
    }

    #[test]
    fn test_page_envelope_carries_pagination() {
        let page = PageRequest::new(Some(2), Some(2)).apply(vec!["a", "b", "c"]);
        let value = serde_json::to_value(ApiResponse::page("customers", page)).unwrap();
        assert_eq!(value["data"]["customers"], json!(["c"]));
        assert_eq!(value["pagination"]["totalCount"], 3);
        assert_eq!(value["pagination"]["totalPages"], 2);
    }

    #[test]
    fn test_optional_window_bounds() {
        assert!(optional_window(None, None).unwrap().is_none());

        let open_end = optional_window(Some("2024-05-01"), None).unwrap().unwrap();
        assert_eq!(open_end.end, DateTime::<Utc>::MAX_UTC);

        let err = optional_window(Some("2024-05-03"), Some("2024-05-01")).unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(optional_window(Some("nope"), None).unwrap_err().status, 400);
    }
}
