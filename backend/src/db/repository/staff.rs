//! Staff and shift persistence.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    ScheduleFilter, ScheduleId, Staff, StaffId, StaffSchedule, TenantId,
};

#[async_trait]
pub trait StaffRepository: Send + Sync {
    /// # Errors
    /// `ConflictError` when the email is already used within the tenant.
    async fn create_staff(&self, staff: Staff) -> RepositoryResult<Staff>;

    async fn get_staff(&self, tenant: TenantId, id: StaffId) -> RepositoryResult<Staff>;

    async fn find_staff_by_email(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Option<Staff>>;

    /// All staff of the tenant ordered by last then first name.
    async fn list_staff(&self, tenant: TenantId) -> RepositoryResult<Vec<Staff>>;

    async fn update_staff(&self, staff: Staff) -> RepositoryResult<Staff>;

    /// Remove a staff member together with their shifts.
    async fn delete_staff(&self, tenant: TenantId, id: StaffId) -> RepositoryResult<()>;

    async fn count_staff(&self, tenant: TenantId) -> RepositoryResult<u64>;

    // ==================== Schedules ====================

    /// Insert a shift.
    ///
    /// The overlap check against the staff member's existing shifts and the
    /// insert happen atomically.
    ///
    /// # Errors
    /// `ConflictError` when the shift overlaps another shift of the same person.
    async fn create_schedule(&self, schedule: StaffSchedule) -> RepositoryResult<StaffSchedule>;

    /// Shifts ordered by start time.
    async fn list_schedules(
        &self,
        tenant: TenantId,
        filter: &ScheduleFilter,
    ) -> RepositoryResult<Vec<StaffSchedule>>;

    async fn delete_schedule(&self, tenant: TenantId, id: ScheduleId) -> RepositoryResult<()>;
}
