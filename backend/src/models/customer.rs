//! Customers and the pets they own.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::tenant::TenantId;
use crate::define_id_type;
use crate::define_text_enum;

define_id_type!(CustomerId);
define_id_type!(PetId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub notes: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive match on name, email or phone.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            Some(&self.first_name),
            Some(&self.last_name),
            self.email.as_ref(),
            self.phone.as_ref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomer {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub emergency_contact_relationship: Option<String>,
}

impl CreateCustomer {
    pub fn into_customer(self, tenant_id: TenantId) -> Customer {
        let now = Utc::now();
        Customer {
            id: CustomerId::generate(),
            tenant_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.map(|e| e.trim().to_lowercase()),
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            notes: self.notes,
            emergency_contact_name: self.emergency_contact_name,
            emergency_contact_phone: self.emergency_contact_phone,
            emergency_contact_relationship: self.emergency_contact_relationship,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub zip_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub emergency_contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub emergency_contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub emergency_contact_relationship: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateCustomer {
    pub fn apply(self, customer: &mut Customer) {
        if let Some(v) = self.first_name {
            customer.first_name = v.trim().to_string();
        }
        if let Some(v) = self.last_name {
            customer.last_name = v.trim().to_string();
        }
        if let Some(v) = self.email {
            customer.email = v.map(|e| e.trim().to_lowercase());
        }
        if let Some(v) = self.phone {
            customer.phone = v;
        }
        if let Some(v) = self.address {
            customer.address = v;
        }
        if let Some(v) = self.city {
            customer.city = v;
        }
        if let Some(v) = self.state {
            customer.state = v;
        }
        if let Some(v) = self.zip_code {
            customer.zip_code = v;
        }
        if let Some(v) = self.notes {
            customer.notes = v;
        }
        if let Some(v) = self.emergency_contact_name {
            customer.emergency_contact_name = v;
        }
        if let Some(v) = self.emergency_contact_phone {
            customer.emergency_contact_phone = v;
        }
        if let Some(v) = self.emergency_contact_relationship {
            customer.emergency_contact_relationship = v;
        }
        if let Some(v) = self.is_active {
            customer.is_active = v;
        }
        customer.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        self.is_active.is_none_or(|active| customer.is_active == active)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| customer.matches_search(needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PetType {
    Dog,
    Cat,
    Other,
}

define_text_enum!(PetType {
    Dog => "DOG",
    Cat => "CAT",
    Other => "OTHER",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: PetId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub name: String,
    pub pet_type: PetType,
    pub breed: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub medical_notes: Option<String>,
    pub behavior_notes: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    /// Icon codes shown next to the pet in the front desk views.
    pub pet_icons: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePet {
    pub customer_id: CustomerId,
    pub name: String,
    #[serde(default = "default_pet_type", alias = "type")]
    pub pet_type: PetType,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub medical_notes: Option<String>,
    #[serde(default)]
    pub behavior_notes: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub pet_icons: Vec<String>,
}

fn default_pet_type() -> PetType {
    PetType::Dog
}

impl CreatePet {
    pub fn into_pet(self, tenant_id: TenantId) -> Pet {
        let now = Utc::now();
        Pet {
            id: PetId::generate(),
            tenant_id,
            customer_id: self.customer_id,
            name: self.name.trim().to_string(),
            pet_type: self.pet_type,
            breed: self.breed,
            birthdate: self.birthdate,
            weight: self.weight,
            medical_notes: self.medical_notes,
            behavior_notes: self.behavior_notes,
            allergies: self.allergies,
            medications: self.medications,
            pet_icons: self.pet_icons,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePet {
    pub name: Option<String>,
    #[serde(alias = "type")]
    pub pet_type: Option<PetType>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub breed: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub birthdate: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub medical_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub behavior_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub allergies: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub medications: Option<Option<String>>,
    pub pet_icons: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdatePet {
    pub fn apply(self, pet: &mut Pet) {
        if let Some(v) = self.name {
            pet.name = v.trim().to_string();
        }
        if let Some(v) = self.pet_type {
            pet.pet_type = v;
        }
        if let Some(v) = self.breed {
            pet.breed = v;
        }
        if let Some(v) = self.birthdate {
            pet.birthdate = v;
        }
        if let Some(v) = self.weight {
            pet.weight = v;
        }
        if let Some(v) = self.medical_notes {
            pet.medical_notes = v;
        }
        if let Some(v) = self.behavior_notes {
            pet.behavior_notes = v;
        }
        if let Some(v) = self.allergies {
            pet.allergies = v;
        }
        if let Some(v) = self.medications {
            pet.medications = v;
        }
        if let Some(v) = self.pet_icons {
            pet.pet_icons = v;
        }
        if let Some(v) = self.is_active {
            pet.is_active = v;
        }
        pet.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetFilter {
    pub customer_id: Option<CustomerId>,
    pub search: Option<String>,
    pub pet_type: Option<PetType>,
}

impl PetFilter {
    pub fn matches(&self, pet: &Pet) -> bool {
        self.customer_id.is_none_or(|id| pet.customer_id == id)
            && self.pet_type.is_none_or(|t| pet.pet_type == t)
            && self.search.as_deref().is_none_or(|needle| {
                let needle = needle.to_lowercase();
                pet.name.to_lowercase().contains(&needle)
                    || pet
                        .breed
                        .as_deref()
                        .is_some_and(|b| b.to_lowercase().contains(&needle))
            })
    }
}
