//! Reservations, their lifecycle and the add-ons attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{AddOnId, ServiceId, ServiceSummary};
use super::customer::{Customer, CustomerId, Pet, PetId, PetType};
use super::resource::{ResourceId, ResourceSummary};
use super::tenant::TenantId;
use super::time::{flexible_timestamp, flexible_timestamp_opt, TimeWindow};
use crate::define_id_type;
use crate::define_text_enum;

define_id_type!(ReservationId);
define_id_type!(ReservationAddOnId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    Completed,
    NoShow,
}

define_text_enum!(ReservationStatus {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    CheckedIn => "CHECKED_IN",
    CheckedOut => "CHECKED_OUT",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
    NoShow => "NO_SHOW",
});

impl ReservationStatus {
    /// Statuses that hold their resource for the reserved window.
    pub const ACTIVE: &'static [ReservationStatus] = &[
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::CheckedIn,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn allowed_transitions(&self) -> &'static [ReservationStatus] {
        use ReservationStatus::*;
        match self {
            Pending => &[Confirmed, CheckedIn, Cancelled],
            Confirmed => &[CheckedIn, Cancelled, NoShow],
            CheckedIn => &[CheckedOut],
            CheckedOut => &[Completed],
            Cancelled | Completed | NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub pet_id: PetId,
    pub service_id: ServiceId,
    pub resource_id: Option<ResourceId>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub price: f64,
    pub notes: Option<String>,
    pub staff_notes: Option<String>,
    /// Identifier in the system the reservation was imported from.
    pub external_id: Option<String>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// True when this reservation holds `resource_id` during `window`.
    pub fn blocks(&self, resource_id: ResourceId, window: &TimeWindow) -> bool {
        self.status.is_active()
            && self.resource_id == Some(resource_id)
            && self.window().overlaps(window)
    }
}

/// Request body for creating a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub customer_id: CustomerId,
    pub pet_id: PetId,
    pub service_id: ServiceId,
    #[serde(default, alias = "kennelId")]
    pub resource_id: Option<ResourceId>,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<ReservationStatus>,
    /// Overrides the catalog price when present.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub staff_notes: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservation {
    pub service_id: Option<ServiceId>,
    #[serde(default, alias = "kennelId", deserialize_with = "super::double_option")]
    pub resource_id: Option<Option<ResourceId>>,
    #[serde(default, deserialize_with = "flexible_timestamp_opt")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_timestamp_opt")]
    pub end_date: Option<DateTime<Utc>>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub staff_notes: Option<Option<String>>,
}

impl UpdateReservation {
    /// Fields that require the overlap check to run again.
    pub fn moves_booking(&self) -> bool {
        self.resource_id.is_some() || self.start_date.is_some() || self.end_date.is_some()
    }

    pub fn apply(self, reservation: &mut Reservation) {
        if let Some(v) = self.service_id {
            reservation.service_id = v;
        }
        if let Some(v) = self.resource_id {
            reservation.resource_id = v;
        }
        if let Some(v) = self.start_date {
            reservation.start_date = v;
        }
        if let Some(v) = self.end_date {
            reservation.end_date = v;
        }
        if let Some(v) = self.price {
            reservation.price = v;
        }
        if let Some(v) = self.notes {
            reservation.notes = v;
        }
        if let Some(v) = self.staff_notes {
            reservation.staff_notes = v;
        }
        reservation.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub customer_id: Option<CustomerId>,
    pub pet_id: Option<PetId>,
    pub resource_id: Option<ResourceId>,
    /// Only reservations overlapping this window.
    pub window: Option<TimeWindow>,
}

impl ReservationFilter {
    pub fn matches(&self, r: &Reservation) -> bool {
        self.status.is_none_or(|s| r.status == s)
            && self.customer_id.is_none_or(|id| r.customer_id == id)
            && self.pet_id.is_none_or(|id| r.pet_id == id)
            && self.resource_id.is_none_or(|id| r.resource_id == Some(id))
            && self.window.is_none_or(|w| r.window().overlaps(&w))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationAddOn {
    pub id: ReservationAddOnId,
    pub tenant_id: TenantId,
    pub reservation_id: ReservationId,
    pub add_on_id: AddOnId,
    pub quantity: i32,
    /// Price captured when the add-on was attached.
    pub unit_price: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReservationAddOn {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservationAddOn {
    pub add_on_id: AddOnId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&Customer> for CustomerSummary {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetSummary {
    pub id: PetId,
    pub name: String,
    pub pet_type: PetType,
    pub breed: Option<String>,
    pub pet_icons: Vec<String>,
}

impl From<&Pet> for PetSummary {
    fn from(p: &Pet) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            pet_type: p.pet_type,
            breed: p.breed.clone(),
            pet_icons: p.pet_icons.clone(),
        }
    }
}

/// Reservation as returned by the API, with its related records inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub customer: Option<CustomerSummary>,
    pub pet: Option<PetSummary>,
    pub resource: Option<ResourceSummary>,
    pub service: Option<ServiceSummary>,
}
