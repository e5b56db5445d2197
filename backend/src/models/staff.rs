//! Staff members and their shifts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tenant::TenantId;
use super::time::TimeWindow;
use crate::define_id_type;
use crate::define_text_enum;

define_id_type!(StaffId);
define_id_type!(ScheduleId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Admin,
    Manager,
    Staff,
    Groomer,
    Trainer,
}

define_text_enum!(StaffRole {
    Admin => "ADMIN",
    Manager => "MANAGER",
    Staff => "STAFF",
    Groomer => "GROOMER",
    Trainer => "TRAINER",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: StaffId,
    pub tenant_id: TenantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: StaffRole,
    pub department: Option<String>,
    pub position: Option<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaff {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_role")]
    pub role: StaffRole,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// Plain-text password, hashed by the staff service before storage.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

fn default_role() -> StaffRole {
    StaffRole::Staff
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaff {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub phone: Option<Option<String>>,
    pub role: Option<StaffRole>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub position: Option<Option<String>>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateStaff {
    /// Applies every field except `password`, which needs hashing first.
    pub fn apply(self, staff: &mut Staff) {
        if let Some(v) = self.first_name {
            staff.first_name = v.trim().to_string();
        }
        if let Some(v) = self.last_name {
            staff.last_name = v.trim().to_string();
        }
        if let Some(v) = self.email {
            staff.email = v.trim().to_lowercase();
        }
        if let Some(v) = self.phone {
            staff.phone = v;
        }
        if let Some(v) = self.role {
            staff.role = v;
        }
        if let Some(v) = self.department {
            staff.department = v;
        }
        if let Some(v) = self.position {
            staff.position = v;
        }
        if let Some(v) = self.is_active {
            staff.is_active = v;
        }
        staff.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSchedule {
    pub id: ScheduleId,
    pub tenant_id: TenantId,
    pub staff_id: StaffId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StaffSchedule {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchedule {
    pub staff_id: StaffId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub staff_id: Option<StaffId>,
    /// Only shifts overlapping this window.
    pub window: Option<TimeWindow>,
}

impl ScheduleFilter {
    pub fn matches(&self, schedule: &StaffSchedule) -> bool {
        self.staff_id.is_none_or(|id| schedule.staff_id == id)
            && self.window.is_none_or(|w| w.overlaps(&schedule.window()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialised() {
        let staff = Staff {
            id: StaffId::generate(),
            tenant_id: TenantId::generate(),
            first_name: "Sam".into(),
            last_name: "Keeper".into(),
            email: "sam@example.com".into(),
            phone: None,
            role: StaffRole::Groomer,
            department: None,
            position: None,
            password_hash: Some("$argon2id$secret".into()),
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&staff).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"GROOMER\""));
    }
}
