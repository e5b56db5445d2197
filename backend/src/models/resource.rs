//! Bookable physical units (kennels and suites).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tenant::TenantId;
use crate::define_id_type;
use crate::define_text_enum;

define_id_type!(ResourceId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Standard,
    StandardPlus,
    Vip,
}

define_text_enum!(ResourceType {
    Standard => "STANDARD",
    StandardPlus => "STANDARD_PLUS",
    Vip => "VIP",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub suite_number: Option<i32>,
    pub description: Option<String>,
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact form embedded in reservation responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub id: ResourceId,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub suite_number: Option<i32>,
}

impl From<&Resource> for ResourceSummary {
    fn from(r: &Resource) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            resource_type: r.resource_type,
            suite_number: r.suite_number,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResource {
    pub name: String,
    #[serde(rename = "type", alias = "resourceType", default = "default_resource_type")]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub suite_number: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
}

fn default_resource_type() -> ResourceType {
    ResourceType::Standard
}

fn default_capacity() -> i32 {
    1
}

impl CreateResource {
    pub fn into_resource(self, tenant_id: TenantId) -> Resource {
        let now = Utc::now();
        Resource {
            id: ResourceId::generate(),
            tenant_id,
            name: self.name.trim().to_string(),
            resource_type: self.resource_type,
            suite_number: self.suite_number,
            description: self.description,
            capacity: self.capacity,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResource {
    pub name: Option<String>,
    #[serde(rename = "type", alias = "resourceType")]
    pub resource_type: Option<ResourceType>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub suite_number: Option<Option<i32>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateResource {
    pub fn apply(self, resource: &mut Resource) {
        if let Some(v) = self.name {
            resource.name = v.trim().to_string();
        }
        if let Some(v) = self.resource_type {
            resource.resource_type = v;
        }
        if let Some(v) = self.suite_number {
            resource.suite_number = v;
        }
        if let Some(v) = self.description {
            resource.description = v;
        }
        if let Some(v) = self.capacity {
            resource.capacity = v;
        }
        if let Some(v) = self.is_active {
            resource.is_active = v;
        }
        resource.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    pub resource_type: Option<ResourceType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl ResourceFilter {
    pub fn matches(&self, resource: &Resource) -> bool {
        self.resource_type.is_none_or(|t| resource.resource_type == t)
            && self.is_active.is_none_or(|a| resource.is_active == a)
            && self.search.as_deref().is_none_or(|needle| {
                resource
                    .name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}
