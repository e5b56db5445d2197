//! Per-request metering records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tenant::TenantId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUsage {
    pub id: uuid::Uuid,
    pub tenant_id: TenantId,
    /// Route template, e.g. `/api/v1/customers/{id}`.
    pub endpoint: String,
    pub method: String,
    pub status_code: i32,
    pub duration_ms: i64,
    pub recorded_at: DateTime<Utc>,
}

impl TenantUsage {
    pub fn new(
        tenant_id: TenantId,
        endpoint: impl Into<String>,
        method: impl Into<String>,
        status_code: u16,
        duration_ms: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            tenant_id,
            endpoint: endpoint.into(),
            method: method.into(),
            status_code: status_code as i32,
            duration_ms,
            recorded_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointUsage {
    pub endpoint: String,
    pub method: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub tenant_id: TenantId,
    pub since: Option<DateTime<Utc>>,
    pub total_requests: u64,
    pub error_count: u64,
    pub average_duration_ms: f64,
    pub by_endpoint: Vec<EndpointUsage>,
}

impl UsageSummary {
    pub fn from_records(
        tenant_id: TenantId,
        since: Option<DateTime<Utc>>,
        records: &[TenantUsage],
    ) -> Self {
        let mut counts: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        let mut total_ms = 0i64;
        let mut errors = 0u64;
        for r in records {
            *counts.entry((r.endpoint.as_str(), r.method.as_str())).or_default() += 1;
            total_ms += r.duration_ms;
            if r.is_error() {
                errors += 1;
            }
        }
        let mut by_endpoint: Vec<EndpointUsage> = counts
            .into_iter()
            .map(|((endpoint, method), count)| EndpointUsage {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                count,
            })
            .collect();
        by_endpoint.sort_by(|a, b| b.count.cmp(&a.count));

        let total = records.len() as u64;
        Self {
            tenant_id,
            since,
            total_requests: total,
            error_count: errors,
            average_duration_ms: if total == 0 {
                0.0
            } else {
                total_ms as f64 / total as f64
            },
            by_endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_errors_and_groups_endpoints() {
        let tenant = TenantId::generate();
        let records = vec![
            TenantUsage::new(tenant, "/api/v1/customers", "GET", 200, 10),
            TenantUsage::new(tenant, "/api/v1/customers", "GET", 200, 20),
            TenantUsage::new(tenant, "/api/v1/customers", "POST", 400, 30),
        ];
        let summary = UsageSummary::from_records(tenant, None, &records);
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.average_duration_ms, 20.0);
        assert_eq!(summary.by_endpoint[0].count, 2);
        assert_eq!(summary.by_endpoint[0].method, "GET");
    }

    #[test]
    fn test_empty_summary() {
        let summary = UsageSummary::from_records(TenantId::generate(), None, &[]);
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.average_duration_ms, 0.0);
    }
}
