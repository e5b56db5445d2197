//! Staff members and their shifts.

use chrono::Utc;

use super::auth::hash_password;
use super::tenants::{ensure_quota, Quota};
use super::validation;
use crate::db::repository::FullRepository;
use crate::error::AppResult;
use crate::models::{
    CreateSchedule, CreateStaff, ScheduleFilter, ScheduleId, Staff, StaffId, StaffSchedule,
    Tenant, TenantId, UpdateStaff,
};

pub async fn create_staff<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: &Tenant,
    request: CreateStaff,
) -> AppResult<Staff> {
    validation::require_text(&request.first_name, "firstName")?;
    validation::require_text(&request.last_name, "lastName")?;
    validation::validate_email(&request.email)?;

    ensure_quota(tenant, Quota::Staff, repo.count_staff(tenant.id).await?)?;

    let password_hash = request.password.as_deref().map(hash_password).transpose()?;
    let now = Utc::now();
    let staff = Staff {
        id: StaffId::generate(),
        tenant_id: tenant.id,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        phone: request.phone,
        role: request.role,
        department: request.department,
        position: request.position,
        password_hash,
        is_active: true,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };
    Ok(repo.create_staff(staff).await?)
}

pub async fn get_staff<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: StaffId,
) -> AppResult<Staff> {
    Ok(repo.get_staff(tenant, id).await?)
}

pub async fn list_staff<R: FullRepository + ?Sized>(repo: &R, tenant: TenantId) -> AppResult<Vec<Staff>> {
    Ok(repo.list_staff(tenant).await?)
}

pub async fn update_staff<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: StaffId,
    mut patch: UpdateStaff,
) -> AppResult<Staff> {
    if let Some(v) = &patch.first_name {
        validation::require_text(v, "firstName")?;
    }
    if let Some(v) = &patch.last_name {
        validation::require_text(v, "lastName")?;
    }
    if let Some(v) = &patch.email {
        validation::validate_email(v)?;
    }
    let new_hash = patch.password.take().as_deref().map(hash_password).transpose()?;

    let mut staff = repo.get_staff(tenant, id).await?;
    patch.apply(&mut staff);
    if new_hash.is_some() {
        staff.password_hash = new_hash;
    }
    Ok(repo.update_staff(staff).await?)
}

pub async fn delete_staff<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: StaffId,
) -> AppResult<()> {
    Ok(repo.delete_staff(tenant, id).await?)
}

// ==================== Schedules ====================

pub async fn create_schedule<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    request: CreateSchedule,
) -> AppResult<StaffSchedule> {
    validation::window(request.start_time, request.end_time)?;
    repo.get_staff(tenant, request.staff_id).await?;

    let schedule = StaffSchedule {
        id: ScheduleId::generate(),
        tenant_id: tenant,
        staff_id: request.staff_id,
        start_time: request.start_time,
        end_time: request.end_time,
        notes: request.notes,
        created_at: Utc::now(),
    };
    Ok(repo.create_schedule(schedule).await?)
}

pub async fn list_schedules<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    filter: &ScheduleFilter,
) -> AppResult<Vec<StaffSchedule>> {
    Ok(repo.list_schedules(tenant, filter).await?)
}

/// Shifts of one staff member; 404 when the staff member is unknown.
pub async fn list_staff_schedules<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    staff: StaffId,
    mut filter: ScheduleFilter,
) -> AppResult<Vec<StaffSchedule>> {
    repo.get_staff(tenant, staff).await?;
    filter.staff_id = Some(staff);
    Ok(repo.list_schedules(tenant, &filter).await?)
}

pub async fn delete_schedule<R: FullRepository + ?Sized>(
    repo: &R,
    tenant: TenantId,
    id: ScheduleId,
) -> AppResult<()> {
    Ok(repo.delete_schedule(tenant, id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::TenantRepository;
    use crate::models::{parse_timestamp, StaffRole};

    fn groomer(email: &str) -> CreateStaff {
        CreateStaff {
            first_name: "Gia".into(),
            last_name: "Groomer".into(),
            email: email.into(),
            phone: None,
            role: StaffRole::Groomer,
            department: None,
            position: None,
            password: Some("s3cret-pass".into()),
        }
    }

    fn shift(staff: StaffId, start: &str, end: &str) -> CreateSchedule {
        CreateSchedule {
            staff_id: staff,
            start_time: parse_timestamp(start).unwrap(),
            end_time: parse_timestamp(end).unwrap(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_password_is_hashed_and_email_lowercased() {
        let repo = LocalRepository::with_demo_tenant("dev");
        let tenant = repo.get_tenant_by_slug("dev").await.unwrap();
        let staff = create_staff(&repo, &tenant, groomer("Gia@Example.com")).await.unwrap();
        assert_eq!(staff.email, "gia@example.com");
        let hash = staff.password_hash.unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_overlapping_shift_conflicts() {
        let repo = LocalRepository::with_demo_tenant("dev");
        let tenant = repo.get_tenant_by_slug("dev").await.unwrap();
        let staff = create_staff(&repo, &tenant, groomer("gia@example.com")).await.unwrap();

        create_schedule(&repo, tenant.id, shift(staff.id, "2024-06-01T08:00:00Z", "2024-06-01T16:00:00Z"))
            .await
            .unwrap();
        let err = create_schedule(&repo, tenant.id, shift(staff.id, "2024-06-01T15:00:00Z", "2024-06-01T20:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.status, 409);

        // Back-to-back shifts are fine.
        create_schedule(&repo, tenant.id, shift(staff.id, "2024-06-01T16:00:00Z", "2024-06-01T20:00:00Z"))
            .await
            .unwrap();

        let inverted = shift(staff.id, "2024-06-02T10:00:00Z", "2024-06-02T09:00:00Z");
        assert_eq!(create_schedule(&repo, tenant.id, inverted).await.unwrap_err().status, 400);
    }
}
