//! Sellable services and add-ons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tenant::TenantId;
use crate::define_id_type;
use crate::define_text_enum;

define_id_type!(ServiceId);
define_id_type!(AddOnId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCategory {
    Boarding,
    Daycare,
    Grooming,
    Training,
    Other,
}

define_text_enum!(ServiceCategory {
    Boarding => "BOARDING",
    Daycare => "DAYCARE",
    Grooming => "GROOMING",
    Training => "TRAINING",
    Other => "OTHER",
});

impl ServiceCategory {
    /// Boarding is charged per night, everything else per visit.
    pub fn is_nightly(&self) -> bool {
        matches!(self, ServiceCategory::Boarding)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub service_category: ServiceCategory,
    pub price: f64,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: ServiceId,
    pub name: String,
    pub service_category: ServiceCategory,
    pub price: f64,
}

impl From<&Service> for ServiceSummary {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            service_category: s.service_category,
            price: s.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateService {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "category")]
    pub service_category: ServiceCategory,
    pub price: f64,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
}

impl CreateService {
    pub fn into_service(self, tenant_id: TenantId) -> Service {
        let now = Utc::now();
        Service {
            id: ServiceId::generate(),
            tenant_id,
            name: self.name.trim().to_string(),
            description: self.description,
            service_category: self.service_category,
            price: self.price,
            duration_minutes: self.duration_minutes,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateService {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    #[serde(alias = "category")]
    pub service_category: Option<ServiceCategory>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub duration_minutes: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl UpdateService {
    pub fn apply(self, service: &mut Service) {
        if let Some(v) = self.name {
            service.name = v.trim().to_string();
        }
        if let Some(v) = self.description {
            service.description = v;
        }
        if let Some(v) = self.service_category {
            service.service_category = v;
        }
        if let Some(v) = self.price {
            service.price = v;
        }
        if let Some(v) = self.duration_minutes {
            service.duration_minutes = v;
        }
        if let Some(v) = self.is_active {
            service.is_active = v;
        }
        service.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub category: Option<ServiceCategory>,
    pub is_active: Option<bool>,
}

impl ServiceFilter {
    pub fn matches(&self, service: &Service) -> bool {
        self.category.is_none_or(|c| service.service_category == c)
            && self.is_active.is_none_or(|a| service.is_active == a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOnService {
    pub id: AddOnId,
    pub tenant_id: TenantId,
    /// Restricts the add-on to reservations of one service.
    pub service_id: Option<ServiceId>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddOn {
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
}

impl CreateAddOn {
    pub fn into_add_on(self, tenant_id: TenantId) -> AddOnService {
        let now = Utc::now();
        AddOnService {
            id: AddOnId::generate(),
            tenant_id,
            service_id: self.service_id,
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAddOn {
    #[serde(default, deserialize_with = "super::double_option")]
    pub service_id: Option<Option<ServiceId>>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub is_active: Option<bool>,
}

impl UpdateAddOn {
    pub fn apply(self, add_on: &mut AddOnService) {
        if let Some(v) = self.service_id {
            add_on.service_id = v;
        }
        if let Some(v) = self.name {
            add_on.name = v.trim().to_string();
        }
        if let Some(v) = self.description {
            add_on.description = v;
        }
        if let Some(v) = self.price {
            add_on.price = v;
        }
        if let Some(v) = self.is_active {
            add_on.is_active = v;
        }
        add_on.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOnFilter {
    pub service_id: Option<ServiceId>,
    pub is_active: Option<bool>,
}

impl AddOnFilter {
    /// Add-ons without a service link apply to every service.
    pub fn matches(&self, add_on: &AddOnService) -> bool {
        self.service_id
            .is_none_or(|id| add_on.service_id.is_none_or(|own| own == id))
            && self.is_active.is_none_or(|a| add_on.is_active == a)
    }
}
