//! Row types mirroring `schema.rs` and their conversions to domain models.
//!
//! Enum columns are stored as their text form; a value that no longer parses
//! surfaces as an internal error rather than a panic.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use super::schema::{
    add_on_services, checkout_idempotency_keys, customers, financial_transactions,
    invoice_line_items, invoices, payments, pets, reservation_add_ons, reservations, resources,
    services, staff, staff_schedules, tenant_usage, tenants,
};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::*;

fn parse_text<T>(value: &str, column: &str) -> RepositoryResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse::<T>().map_err(|e| {
        RepositoryError::internal(e).with_operation(format!("decode {}", column))
    })
}

fn strings_to_json(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

fn json_to_strings(value: Value, column: &str) -> RepositoryResult<Vec<String>> {
    serde_json::from_value(value).map_err(|e| {
        RepositoryError::internal(format!("Failed to parse {} JSON: {}", column, e))
    })
}

// ==================== Tenants ====================

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tenants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: String,
    pub features: Value,
    pub max_customers: Option<i32>,
    pub max_staff: Option<i32>,
    pub max_resources: Option<i32>,
    pub rate_limit_per_minute: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Tenant> for TenantRow {
    fn from(t: &Tenant) -> Self {
        Self {
            id: t.id.value(),
            name: t.name.clone(),
            slug: t.slug.clone(),
            subscription_tier: t.subscription_tier.as_str().to_string(),
            features: strings_to_json(&t.features),
            max_customers: t.max_customers,
            max_staff: t.max_staff,
            max_resources: t.max_resources,
            rate_limit_per_minute: t.rate_limit_per_minute,
            is_active: t.is_active,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

impl TryFrom<TenantRow> for Tenant {
    type Error = RepositoryError;

    fn try_from(row: TenantRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: TenantId(row.id),
            name: row.name,
            slug: row.slug,
            subscription_tier: parse_text(&row.subscription_tier, "tenants.subscription_tier")?,
            features: json_to_strings(row.features, "tenants.features")?,
            max_customers: row.max_customers,
            max_staff: row.max_staff,
            max_resources: row.max_resources,
            rate_limit_per_minute: row.rate_limit_per_minute,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ==================== Customers & pets ====================

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct CustomerRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
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

impl From<&Customer> for CustomerRow {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id.value(),
            tenant_id: c.tenant_id.value(),
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            address: c.address.clone(),
            city: c.city.clone(),
            state: c.state.clone(),
            zip_code: c.zip_code.clone(),
            notes: c.notes.clone(),
            emergency_contact_name: c.emergency_contact_name.clone(),
            emergency_contact_phone: c.emergency_contact_phone.clone(),
            emergency_contact_relationship: c.emergency_contact_relationship.clone(),
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: CustomerId(row.id),
            tenant_id: TenantId(row.tenant_id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            notes: row.notes,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            emergency_contact_relationship: row.emergency_contact_relationship,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = pets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct PetRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub pet_type: String,
    pub breed: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub medical_notes: Option<String>,
    pub behavior_notes: Option<String>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub pet_icons: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Pet> for PetRow {
    fn from(p: &Pet) -> Self {
        Self {
            id: p.id.value(),
            tenant_id: p.tenant_id.value(),
            customer_id: p.customer_id.value(),
            name: p.name.clone(),
            pet_type: p.pet_type.as_str().to_string(),
            breed: p.breed.clone(),
            birthdate: p.birthdate,
            weight: p.weight,
            medical_notes: p.medical_notes.clone(),
            behavior_notes: p.behavior_notes.clone(),
            allergies: p.allergies.clone(),
            medications: p.medications.clone(),
            pet_icons: strings_to_json(&p.pet_icons),
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl TryFrom<PetRow> for Pet {
    type Error = RepositoryError;

    fn try_from(row: PetRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: PetId(row.id),
            tenant_id: TenantId(row.tenant_id),
            customer_id: CustomerId(row.customer_id),
            name: row.name,
            pet_type: parse_text(&row.pet_type, "pets.pet_type")?,
            breed: row.breed,
            birthdate: row.birthdate,
            weight: row.weight,
            medical_notes: row.medical_notes,
            behavior_notes: row.behavior_notes,
            allergies: row.allergies,
            medications: row.medications,
            pet_icons: json_to_strings(row.pet_icons, "pets.pet_icons")?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ==================== Staff ====================

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = staff)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct StaffRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Staff> for StaffRow {
    fn from(s: &Staff) -> Self {
        Self {
            id: s.id.value(),
            tenant_id: s.tenant_id.value(),
            first_name: s.first_name.clone(),
            last_name: s.last_name.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            role: s.role.as_str().to_string(),
            department: s.department.clone(),
            position: s.position.clone(),
            password_hash: s.password_hash.clone(),
            is_active: s.is_active,
            last_login_at: s.last_login_at,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

impl TryFrom<StaffRow> for Staff {
    type Error = RepositoryError;

    fn try_from(row: StaffRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: StaffId(row.id),
            tenant_id: TenantId(row.tenant_id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            role: parse_text(&row.role, "staff.role")?,
            department: row.department,
            position: row.position,
            password_hash: row.password_hash,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = staff_schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScheduleRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub staff_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&StaffSchedule> for ScheduleRow {
    fn from(s: &StaffSchedule) -> Self {
        Self {
            id: s.id.value(),
            tenant_id: s.tenant_id.value(),
            staff_id: s.staff_id.value(),
            start_time: s.start_time,
            end_time: s.end_time,
            notes: s.notes.clone(),
            created_at: s.created_at,
        }
    }
}

impl From<ScheduleRow> for StaffSchedule {
    fn from(row: ScheduleRow) -> Self {
        Self {
            id: ScheduleId(row.id),
            tenant_id: TenantId(row.tenant_id),
            staff_id: StaffId(row.staff_id),
            start_time: row.start_time,
            end_time: row.end_time,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

// ==================== Resources & catalog ====================

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = resources)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ResourceRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub resource_type: String,
    pub suite_number: Option<i32>,
    pub description: Option<String>,
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Resource> for ResourceRow {
    fn from(r: &Resource) -> Self {
        Self {
            id: r.id.value(),
            tenant_id: r.tenant_id.value(),
            name: r.name.clone(),
            resource_type: r.resource_type.as_str().to_string(),
            suite_number: r.suite_number,
            description: r.description.clone(),
            capacity: r.capacity,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl TryFrom<ResourceRow> for Resource {
    type Error = RepositoryError;

    fn try_from(row: ResourceRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: ResourceId(row.id),
            tenant_id: TenantId(row.tenant_id),
            name: row.name,
            resource_type: parse_text(&row.resource_type, "resources.resource_type")?,
            suite_number: row.suite_number,
            description: row.description,
            capacity: row.capacity,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ServiceRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub service_category: String,
    pub price: f64,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Service> for ServiceRow {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id.value(),
            tenant_id: s.tenant_id.value(),
            name: s.name.clone(),
            description: s.description.clone(),
            service_category: s.service_category.as_str().to_string(),
            price: s.price,
            duration_minutes: s.duration_minutes,
            is_active: s.is_active,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

impl TryFrom<ServiceRow> for Service {
    type Error = RepositoryError;

    fn try_from(row: ServiceRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: ServiceId(row.id),
            tenant_id: TenantId(row.tenant_id),
            name: row.name,
            description: row.description,
            service_category: parse_text(&row.service_category, "services.service_category")?,
            price: row.price,
            duration_minutes: row.duration_minutes,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = add_on_services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct AddOnRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub service_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AddOnService> for AddOnRow {
    fn from(a: &AddOnService) -> Self {
        Self {
            id: a.id.value(),
            tenant_id: a.tenant_id.value(),
            service_id: a.service_id.map(|s| s.value()),
            name: a.name.clone(),
            description: a.description.clone(),
            price: a.price,
            is_active: a.is_active,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl From<AddOnRow> for AddOnService {
    fn from(row: AddOnRow) -> Self {
        Self {
            id: AddOnId(row.id),
            tenant_id: TenantId(row.tenant_id),
            service_id: row.service_id.map(ServiceId),
            name: row.name,
            description: row.description,
            price: row.price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ==================== Reservations ====================

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = reservations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ReservationRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub resource_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub price: f64,
    pub notes: Option<String>,
    pub staff_notes: Option<String>,
    pub external_id: Option<String>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Reservation> for ReservationRow {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id.value(),
            tenant_id: r.tenant_id.value(),
            customer_id: r.customer_id.value(),
            pet_id: r.pet_id.value(),
            service_id: r.service_id.value(),
            resource_id: r.resource_id.map(|id| id.value()),
            start_date: r.start_date,
            end_date: r.end_date,
            status: r.status.as_str().to_string(),
            price: r.price,
            notes: r.notes.clone(),
            staff_notes: r.staff_notes.clone(),
            external_id: r.external_id.clone(),
            check_in_at: r.check_in_at,
            check_out_at: r.check_out_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = RepositoryError;

    fn try_from(row: ReservationRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: ReservationId(row.id),
            tenant_id: TenantId(row.tenant_id),
            customer_id: CustomerId(row.customer_id),
            pet_id: PetId(row.pet_id),
            service_id: ServiceId(row.service_id),
            resource_id: row.resource_id.map(ResourceId),
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse_text(&row.status, "reservations.status")?,
            price: row.price,
            notes: row.notes,
            staff_notes: row.staff_notes,
            external_id: row.external_id,
            check_in_at: row.check_in_at,
            check_out_at: row.check_out_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reservation_add_ons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReservationAddOnRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub reservation_id: Uuid,
    pub add_on_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ReservationAddOn> for ReservationAddOnRow {
    fn from(a: &ReservationAddOn) -> Self {
        Self {
            id: a.id.value(),
            tenant_id: a.tenant_id.value(),
            reservation_id: a.reservation_id.value(),
            add_on_id: a.add_on_id.value(),
            quantity: a.quantity,
            unit_price: a.unit_price,
            notes: a.notes.clone(),
            created_at: a.created_at,
        }
    }
}

impl From<ReservationAddOnRow> for ReservationAddOn {
    fn from(row: ReservationAddOnRow) -> Self {
        Self {
            id: ReservationAddOnId(row.id),
            tenant_id: TenantId(row.tenant_id),
            reservation_id: ReservationId(row.reservation_id),
            add_on_id: AddOnId(row.add_on_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

// ==================== Billing ====================

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub reservation_id: Option<Uuid>,
    pub status: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceRow {
    fn from(i: &Invoice) -> Self {
        Self {
            id: i.id.value(),
            tenant_id: i.tenant_id.value(),
            invoice_number: i.invoice_number.clone(),
            customer_id: i.customer_id.value(),
            reservation_id: i.reservation_id.map(|id| id.value()),
            status: i.status.as_str().to_string(),
            issue_date: i.issue_date,
            due_date: i.due_date,
            subtotal: i.subtotal,
            tax_rate: i.tax_rate,
            tax_amount: i.tax_amount,
            total: i.total,
            amount_paid: i.amount_paid,
            notes: i.notes.clone(),
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

impl InvoiceRow {
    pub fn into_invoice(self, line_items: Vec<InvoiceLineItem>) -> RepositoryResult<Invoice> {
        Ok(Invoice {
            id: InvoiceId(self.id),
            tenant_id: TenantId(self.tenant_id),
            invoice_number: self.invoice_number,
            customer_id: CustomerId(self.customer_id),
            reservation_id: self.reservation_id.map(ReservationId),
            status: parse_text(&self.status, "invoices.status")?,
            issue_date: self.issue_date,
            due_date: self.due_date,
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            tax_amount: self.tax_amount,
            total: self.total,
            amount_paid: self.amount_paid,
            notes: self.notes,
            line_items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = invoice_line_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LineItemRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub item_type: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub amount: f64,
    pub reference_id: Option<Uuid>,
}

impl From<&InvoiceLineItem> for LineItemRow {
    fn from(l: &InvoiceLineItem) -> Self {
        Self {
            id: l.id.value(),
            invoice_id: l.invoice_id.value(),
            item_type: l.item_type.as_str().to_string(),
            description: l.description.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price,
            amount: l.amount,
            reference_id: l.reference_id,
        }
    }
}

impl TryFrom<LineItemRow> for InvoiceLineItem {
    type Error = RepositoryError;

    fn try_from(row: LineItemRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: LineItemId(row.id),
            invoice_id: InvoiceId(row.invoice_id),
            item_type: parse_text(&row.item_type, "invoice_line_items.item_type")?,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            amount: row.amount,
            reference_id: row.reference_id,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub customer_id: Uuid,
    pub amount: f64,
    pub method: String,
    pub status: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentRow {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id.value(),
            tenant_id: p.tenant_id.value(),
            invoice_id: p.invoice_id.value(),
            customer_id: p.customer_id.value(),
            amount: p.amount,
            method: p.method.as_str().to_string(),
            status: p.status.as_str().to_string(),
            reference: p.reference.clone(),
            notes: p.notes.clone(),
            paid_at: p.paid_at,
        }
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> RepositoryResult<Self> {
        Ok(Self {
            id: PaymentId(row.id),
            tenant_id: TenantId(row.tenant_id),
            invoice_id: InvoiceId(row.invoice_id),
            customer_id: CustomerId(row.customer_id),
            amount: row.amount,
            method: parse_text(&row.method, "payments.method")?,
            status: parse_text(&row.status, "payments.status")?,
            reference: row.reference,
            notes: row.notes,
            paid_at: row.paid_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = financial_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransactionRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&FinancialTransaction> for TransactionRow {
    fn from(t: &FinancialTransaction) -> Self {
        Self {
            id: t.id.value(),
            tenant_id: t.tenant_id.value(),
            invoice_id: t.invoice_id.value(),
            payment_id: t.payment_id.map(|id| id.value()),
            customer_id: t.customer_id.value(),
            amount: t.amount,
            payment_method: t.payment_method.map(|m| m.as_str().to_string()),
            description: t.description.clone(),
            created_at: t.created_at,
        }
    }
}

impl TryFrom<TransactionRow> for FinancialTransaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> RepositoryResult<Self> {
        let payment_method = row
            .payment_method
            .as_deref()
            .map(|m| parse_text(m, "financial_transactions.payment_method"))
            .transpose()?;
        Ok(Self {
            id: TransactionId(row.id),
            tenant_id: TenantId(row.tenant_id),
            invoice_id: InvoiceId(row.invoice_id),
            payment_id: row.payment_id.map(PaymentId),
            customer_id: CustomerId(row.customer_id),
            amount: row.amount,
            payment_method,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = checkout_idempotency_keys)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IdempotencyRow {
    pub tenant_id: Uuid,
    pub idempotency_key: String,
    pub fingerprint: String,
    pub invoice_id: Uuid,
    pub payment_id: Uuid,
    pub transaction_id: Uuid,
    /// The checkout result as first returned.
    pub response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ==================== Usage ====================

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tenant_usage)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UsageRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub status_code: i32,
    pub duration_ms: i64,
    pub recorded_at: DateTime<Utc>,
}

impl From<&TenantUsage> for UsageRow {
    fn from(u: &TenantUsage) -> Self {
        Self {
            id: u.id,
            tenant_id: u.tenant_id.value(),
            endpoint: u.endpoint.clone(),
            method: u.method.clone(),
            status_code: u.status_code,
            duration_ms: u.duration_ms,
            recorded_at: u.recorded_at,
        }
    }
}

impl From<UsageRow> for TenantUsage {
    fn from(row: UsageRow) -> Self {
        Self {
            id: row.id,
            tenant_id: TenantId(row.tenant_id),
            endpoint: row.endpoint,
            method: row.method,
            status_code: row.status_code,
            duration_ms: row.duration_ms,
            recorded_at: row.recorded_at,
        }
    }
}

/// Decode a batch of rows, failing on the first row that does not convert.
pub fn decode_all<R, T>(rows: Vec<R>) -> RepositoryResult<Vec<T>>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

