//! Tenant (organization) domain model.
//!
//! A tenant is the isolation boundary of the SaaS: every customer, pet,
//! reservation and invoice row carries the owning tenant's id and every query
//! filters on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id_type;
use crate::define_text_enum;

define_id_type!(TenantId);

/// Subscription plan, which decides the default feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionTier {
    Starter,
    Professional,
    Enterprise,
}

define_text_enum!(SubscriptionTier {
    Starter => "STARTER",
    Professional => "PROFESSIONAL",
    Enterprise => "ENTERPRISE",
});

impl SubscriptionTier {
    /// Features bundled with the plan.
    pub fn default_features(&self) -> &'static [&'static str] {
        match self {
            SubscriptionTier::Starter => &[],
            SubscriptionTier::Professional => &[features::POS, features::REPORTS],
            SubscriptionTier::Enterprise => &[
                features::POS,
                features::REPORTS,
                features::IMPORT,
            ],
        }
    }
}

/// Feature flag names understood by the services.
pub mod features {
    pub const POS: &str = "pos";
    pub const REPORTS: &str = "reports";
    pub const IMPORT: &str = "import";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    /// URL-safe unique identifier, accepted in place of the id in `x-tenant-id`.
    pub slug: String,
    pub subscription_tier: SubscriptionTier,
    /// Extra feature flags on top of the tier defaults.
    pub features: Vec<String>,
    pub max_customers: Option<i32>,
    pub max_staff: Option<i32>,
    pub max_resources: Option<i32>,
    /// Per-tenant override of the service-wide request limit.
    pub rate_limit_per_minute: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.subscription_tier.default_features().contains(&feature)
            || self.features.iter().any(|f| f == feature)
    }
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_tier")]
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub max_customers: Option<i32>,
    #[serde(default)]
    pub max_staff: Option<i32>,
    #[serde(default)]
    pub max_resources: Option<i32>,
    #[serde(default)]
    pub rate_limit_per_minute: Option<i32>,
}

fn default_tier() -> SubscriptionTier {
    SubscriptionTier::Starter
}

/// Fields that can be updated on an existing tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub max_customers: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub max_staff: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub max_resources: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub rate_limit_per_minute: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl UpdateTenant {
    pub fn apply(self, tenant: &mut Tenant) {
        if let Some(name) = self.name {
            tenant.name = name;
        }
        if let Some(tier) = self.subscription_tier {
            tenant.subscription_tier = tier;
        }
        if let Some(features) = self.features {
            tenant.features = features;
        }
        if let Some(v) = self.max_customers {
            tenant.max_customers = v;
        }
        if let Some(v) = self.max_staff {
            tenant.max_staff = v;
        }
        if let Some(v) = self.max_resources {
            tenant.max_resources = v;
        }
        if let Some(v) = self.rate_limit_per_minute {
            tenant.rate_limit_per_minute = v;
        }
        if let Some(active) = self.is_active {
            tenant.is_active = active;
        }
        tenant.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(tier: SubscriptionTier, features: &[&str]) -> Tenant {
        Tenant {
            id: TenantId::generate(),
            name: "Happy Tails".into(),
            slug: "happy-tails".into(),
            subscription_tier: tier,
            features: features.iter().map(|f| f.to_string()).collect(),
            max_customers: None,
            max_staff: None,
            max_resources: None,
            rate_limit_per_minute: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tier_defaults_and_explicit_flags() {
        assert!(!tenant(SubscriptionTier::Starter, &[]).has_feature(features::POS));
        assert!(tenant(SubscriptionTier::Starter, &["pos"]).has_feature(features::POS));
        assert!(tenant(SubscriptionTier::Professional, &[]).has_feature(features::REPORTS));
        assert!(tenant(SubscriptionTier::Enterprise, &[]).has_feature(features::IMPORT));
    }

    #[test]
    fn test_update_can_clear_quota() {
        let mut t = tenant(SubscriptionTier::Starter, &[]);
        t.max_customers = Some(10);
        UpdateTenant {
            max_customers: Some(None),
            ..Default::default()
        }
        .apply(&mut t);
        assert_eq!(t.max_customers, None);
    }

    #[test]
    fn test_tier_text_roundtrip() {
        assert_eq!("professional".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Professional);
        assert!("gold".parse::<SubscriptionTier>().is_err());
    }
}
