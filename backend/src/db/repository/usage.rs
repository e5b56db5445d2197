//! Append-only request metering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{TenantId, TenantUsage, UsageSummary};

#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn record_usage(&self, usage: TenantUsage) -> RepositoryResult<()>;

    /// Records at or after `since`, newest first, at most `limit` of them.
    async fn list_usage(
        &self,
        tenant: TenantId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> RepositoryResult<Vec<TenantUsage>>;

    async fn usage_summary(
        &self,
        tenant: TenantId,
        since: Option<DateTime<Utc>>,
    ) -> RepositoryResult<UsageSummary>;
}
