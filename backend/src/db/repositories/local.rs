//! In-memory local repository implementation.
//!
//! Implements every repository trait over `HashMap`s behind a single
//! `parking_lot::RwLock`. Writes that must be atomic (reservation overlap
//! checks, shift overlap checks, payments, checkout) run entirely under the
//! write lock, which gives the same guarantee the Postgres implementation gets
//! from row locks.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use crate::db::repository::*;
use crate::models::*;

/// Table names understood by [`LocalRepository::simulate_missing_table`].
pub mod tables {
    pub const SERVICES: &str = "services";
    pub const ADD_ONS: &str = "add_on_services";
    pub const TENANT_USAGE: &str = "tenant_usage";
}

/// In-memory repository for tests and local development.
///
/// # Example
/// ```
/// use tailtown::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::with_demo_tenant("dev");
/// repo.set_healthy(false);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    tenants: HashMap<TenantId, Tenant>,
    customers: HashMap<CustomerId, Customer>,
    pets: HashMap<PetId, Pet>,
    staff: HashMap<StaffId, Staff>,
    schedules: HashMap<ScheduleId, StaffSchedule>,
    resources: HashMap<ResourceId, Resource>,
    services: HashMap<ServiceId, Service>,
    add_ons: HashMap<AddOnId, AddOnService>,
    reservations: HashMap<ReservationId, Reservation>,
    reservation_add_ons: Vec<ReservationAddOn>,
    invoices: HashMap<InvoiceId, Invoice>,
    payments: Vec<Payment>,
    transactions: Vec<FinancialTransaction>,
    usage: Vec<TenantUsage>,

    invoice_sequences: HashMap<(TenantId, NaiveDate), u32>,
    idempotency: HashMap<(TenantId, String), (String, CheckoutResult)>,

    // Test hooks
    unhealthy: bool,
    missing_tables: HashSet<String>,
}

/// Rows that belong to a tenant.
trait TenantScoped {
    fn tenant(&self) -> TenantId;
}

macro_rules! tenant_scoped {
    ($($ty:ty),+) => {
        $(impl TenantScoped for $ty {
            fn tenant(&self) -> TenantId {
                self.tenant_id
            }
        })+
    };
}

tenant_scoped!(
    Customer,
    Pet,
    Staff,
    StaffSchedule,
    Resource,
    Service,
    AddOnService,
    Reservation,
    Invoice
);

/// Fetch a row only if it belongs to `tenant`; other tenants' rows are
/// reported as missing, never as forbidden.
fn scoped<K, V>(
    map: &HashMap<K, V>,
    tenant: TenantId,
    id: K,
    entity: &str,
) -> RepositoryResult<V>
where
    K: Eq + Hash + std::fmt::Display,
    V: TenantScoped + Clone,
{
    map.get(&id)
        .filter(|v| v.tenant() == tenant)
        .cloned()
        .ok_or_else(|| RepositoryError::entity_not_found(entity, id))
}

fn ensure_exists<K, V>(map: &HashMap<K, V>, tenant: TenantId, id: K, entity: &str) -> RepositoryResult<()>
where
    K: Eq + Hash + std::fmt::Display,
    V: TenantScoped,
{
    match map.get(&id) {
        Some(v) if v.tenant() == tenant => Ok(()),
        _ => Err(RepositoryError::entity_not_found(entity, id)),
    }
}

fn same_email(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.eq_ignore_ascii_case(b))
}

impl LocalData {
    fn stored_checkout(
        &self,
        tenant: TenantId,
        key: &IdempotencyKey,
    ) -> RepositoryResult<Option<CheckoutResult>> {
        match self.idempotency.get(&(tenant, key.key.clone())) {
            Some((fingerprint, _)) if *fingerprint != key.fingerprint => {
                Err(RepositoryError::conflict(
                    "Idempotency key was already used with a different request",
                ))
            }
            Some((_, stored)) => Ok(Some(CheckoutResult {
                replayed: true,
                ..stored.clone()
            })),
            None => Ok(None),
        }
    }

    fn overlapping(
        &self,
        tenant: TenantId,
        resource: ResourceId,
        window: &TimeWindow,
        exclude: Option<ReservationId>,
    ) -> Vec<Reservation> {
        let mut hits: Vec<Reservation> = self
            .reservations
            .values()
            .filter(|r| r.tenant_id == tenant && Some(r.id) != exclude)
            .filter(|r| r.blocks(resource, window))
            .cloned()
            .collect();
        hits.sort_by_key(|r| r.start_date);
        hits
    }

    fn check_occupancy(&self, reservation: &Reservation) -> RepositoryResult<()> {
        let Some(resource) = reservation.resource_id else {
            return Ok(());
        };
        if !reservation.status.is_active() {
            return Ok(());
        }
        let clashes = self.overlapping(
            reservation.tenant_id,
            resource,
            &reservation.window(),
            Some(reservation.id),
        );
        match clashes.first() {
            None => Ok(()),
            Some(existing) => Err(RepositoryError::conflict_with_context(
                format!(
                    "Resource {} is already reserved from {} to {}",
                    resource,
                    existing.start_date.to_rfc3339(),
                    existing.end_date.to_rfc3339()
                ),
                ErrorContext::new("check_occupancy")
                    .with_entity("reservation")
                    .with_entity_id(existing.id),
            )),
        }
    }

    fn next_invoice_number(&mut self, tenant: TenantId, issued: DateTime<Utc>) -> String {
        let date = issued.date_naive();
        let seq = self.invoice_sequences.entry((tenant, date)).or_insert(0);
        *seq += 1;
        format_invoice_number(date, *seq)
    }

    fn insert_invoice(&mut self, mut invoice: Invoice) -> Invoice {
        invoice.invoice_number = self.next_invoice_number(invoice.tenant_id, invoice.issue_date);
        self.invoices.insert(invoice.id, invoice.clone());
        invoice
    }

    /// Apply a payment to a stored invoice, writing the payment and its audit row.
    fn settle(&mut self, payment: Payment) -> RepositoryResult<PaymentReceipt> {
        let mut invoice = scoped(&self.invoices, payment.tenant_id, payment.invoice_id, "invoice")?;
        invoice
            .apply_payment(payment.amount)
            .map_err(RepositoryError::validation)?;
        let transaction = FinancialTransaction::for_payment(&invoice, &payment);

        self.invoices.insert(invoice.id, invoice.clone());
        self.payments.push(payment.clone());
        self.transactions.push(transaction.clone());
        Ok(PaymentReceipt {
            invoice,
            payment,
            transaction,
        })
    }

    fn table_missing(&self, table: &str) -> RepositoryResult<()> {
        if self.missing_tables.contains(table) {
            return Err(RepositoryError::schema(format!(
                "relation \"{}\" does not exist",
                table
            )));
        }
        Ok(())
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Create a repository holding one active tenant, used as the development
    /// default when no tenant header is sent.
    pub fn with_demo_tenant(slug: &str) -> Self {
        let repo = Self::new();
        let now = Utc::now();
        let tenant = Tenant {
            id: TenantId::generate(),
            name: "Demo Resort".to_string(),
            slug: slug.to_string(),
            subscription_tier: SubscriptionTier::Enterprise,
            features: Vec::new(),
            max_customers: None,
            max_staff: None,
            max_resources: None,
            rate_limit_per_minute: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        repo.data.write().tenants.insert(tenant.id, tenant);
        repo
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().unhealthy = !healthy;
    }

    /// Make reads of `table` fail with a schema error, as they would against
    /// a database that has not run the latest migrations.
    pub fn simulate_missing_table(&self, table: &str) {
        self.data.write().missing_tables.insert(table.to_string());
    }

    /// Clear all data, keeping the test hooks.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let unhealthy = data.unhealthy;
        let missing = std::mem::take(&mut data.missing_tables);
        *data = LocalData {
            unhealthy,
            missing_tables: missing,
            ..Default::default()
        };
    }

    pub fn reservation_count(&self) -> usize {
        self.data.read().reservations.len()
    }

    fn check_health(&self) -> RepositoryResult<()> {
        if self.data.read().unhealthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Tenants ====================

#[async_trait]
impl TenantRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(!self.data.read().unhealthy)
    }

    async fn create_tenant(&self, tenant: Tenant) -> RepositoryResult<Tenant> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(RepositoryError::conflict(format!(
                "Tenant slug '{}' is already taken",
                tenant.slug
            )));
        }
        data.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn get_tenant(&self, id: TenantId) -> RepositoryResult<Tenant> {
        self.check_health()?;
        self.data
            .read()
            .tenants
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::entity_not_found("tenant", id))
    }

    async fn get_tenant_by_slug(&self, slug: &str) -> RepositoryResult<Tenant> {
        self.check_health()?;
        self.data
            .read()
            .tenants
            .values()
            .find(|t| t.slug == slug)
            .cloned()
            .ok_or_else(|| RepositoryError::entity_not_found("tenant", slug))
    }

    async fn list_tenants(&self) -> RepositoryResult<Vec<Tenant>> {
        self.check_health()?;
        let mut tenants: Vec<Tenant> = self.data.read().tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tenants)
    }

    async fn update_tenant(&self, tenant: Tenant) -> RepositoryResult<Tenant> {
        self.check_health()?;
        let mut data = self.data.write();
        let existing = data
            .tenants
            .get_mut(&tenant.id)
            .ok_or_else(|| RepositoryError::entity_not_found("tenant", tenant.id))?;
        let slug = existing.slug.clone();
        *existing = Tenant { slug, ..tenant };
        Ok(existing.clone())
    }
}

// ==================== Customers & pets ====================

#[async_trait]
impl CustomerRepository for LocalRepository {
    async fn create_customer(&self, customer: Customer) -> RepositoryResult<Customer> {
        self.check_health()?;
        let mut data = self.data.write();
        if let Some(email) = customer.email.as_deref() {
            let taken = data.customers.values().any(|c| {
                c.tenant_id == customer.tenant_id && same_email(c.email.as_deref(), email)
            });
            if taken {
                return Err(RepositoryError::conflict(format!(
                    "A customer with email {} already exists",
                    email
                )));
            }
        }
        data.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, tenant: TenantId, id: CustomerId) -> RepositoryResult<Customer> {
        self.check_health()?;
        scoped(&self.data.read().customers, tenant, id, "customer")
    }

    async fn list_customers(
        &self,
        tenant: TenantId,
        filter: &CustomerFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Customer>> {
        self.check_health()?;
        let mut customers: Vec<Customer> = self
            .data
            .read()
            .customers
            .values()
            .filter(|c| c.tenant_id == tenant && filter.matches(c))
            .cloned()
            .collect();
        customers.sort_by(|a, b| {
            (a.last_name.to_lowercase(), a.first_name.to_lowercase())
                .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
        });
        Ok(page.apply(customers))
    }

    async fn find_customer_by_email(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Option<Customer>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .customers
            .values()
            .find(|c| c.tenant_id == tenant && same_email(c.email.as_deref(), email))
            .cloned())
    }

    async fn update_customer(&self, customer: Customer) -> RepositoryResult<Customer> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.customers, customer.tenant_id, customer.id, "customer")?;
        if let Some(email) = customer.email.as_deref() {
            let taken = data.customers.values().any(|c| {
                c.id != customer.id
                    && c.tenant_id == customer.tenant_id
                    && same_email(c.email.as_deref(), email)
            });
            if taken {
                return Err(RepositoryError::conflict(format!(
                    "A customer with email {} already exists",
                    email
                )));
            }
        }
        data.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn delete_customer(&self, tenant: TenantId, id: CustomerId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.customers, tenant, id, "customer")?;
        if data.reservations.values().any(|r| r.customer_id == id) {
            return Err(RepositoryError::conflict(
                "Customer has reservations and cannot be permanently deleted",
            ));
        }
        if data.invoices.values().any(|i| i.customer_id == id) {
            return Err(RepositoryError::conflict(
                "Customer has invoices and cannot be permanently deleted",
            ));
        }
        data.pets.retain(|_, p| p.customer_id != id);
        data.customers.remove(&id);
        Ok(())
    }

    async fn count_customers(&self, tenant: TenantId) -> RepositoryResult<u64> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .customers
            .values()
            .filter(|c| c.tenant_id == tenant)
            .count() as u64)
    }

    async fn create_pet(&self, pet: Pet) -> RepositoryResult<Pet> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.customers, pet.tenant_id, pet.customer_id, "customer")?;
        data.pets.insert(pet.id, pet.clone());
        Ok(pet)
    }

    async fn get_pet(&self, tenant: TenantId, id: PetId) -> RepositoryResult<Pet> {
        self.check_health()?;
        scoped(&self.data.read().pets, tenant, id, "pet")
    }

    async fn list_pets(&self, tenant: TenantId, filter: &PetFilter) -> RepositoryResult<Vec<Pet>> {
        self.check_health()?;
        let mut pets: Vec<Pet> = self
            .data
            .read()
            .pets
            .values()
            .filter(|p| p.tenant_id == tenant && filter.matches(p))
            .cloned()
            .collect();
        pets.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(pets)
    }

    async fn update_pet(&self, pet: Pet) -> RepositoryResult<Pet> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.pets, pet.tenant_id, pet.id, "pet")?;
        data.pets.insert(pet.id, pet.clone());
        Ok(pet)
    }

    async fn delete_pet(&self, tenant: TenantId, id: PetId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.pets, tenant, id, "pet")?;
        if data.reservations.values().any(|r| r.pet_id == id) {
            return Err(RepositoryError::conflict(
                "Pet has reservations and cannot be permanently deleted",
            ));
        }
        data.pets.remove(&id);
        Ok(())
    }
}

// ==================== Staff ====================

#[async_trait]
impl StaffRepository for LocalRepository {
    async fn create_staff(&self, staff: Staff) -> RepositoryResult<Staff> {
        self.check_health()?;
        let mut data = self.data.write();
        let taken = data
            .staff
            .values()
            .any(|s| s.tenant_id == staff.tenant_id && s.email.eq_ignore_ascii_case(&staff.email));
        if taken {
            return Err(RepositoryError::conflict(format!(
                "A staff member with email {} already exists",
                staff.email
            )));
        }
        data.staff.insert(staff.id, staff.clone());
        Ok(staff)
    }

    async fn get_staff(&self, tenant: TenantId, id: StaffId) -> RepositoryResult<Staff> {
        self.check_health()?;
        scoped(&self.data.read().staff, tenant, id, "staff")
    }

    async fn find_staff_by_email(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Option<Staff>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .staff
            .values()
            .find(|s| s.tenant_id == tenant && s.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_staff(&self, tenant: TenantId) -> RepositoryResult<Vec<Staff>> {
        self.check_health()?;
        let mut staff: Vec<Staff> = self
            .data
            .read()
            .staff
            .values()
            .filter(|s| s.tenant_id == tenant)
            .cloned()
            .collect();
        staff.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(staff)
    }

    async fn update_staff(&self, staff: Staff) -> RepositoryResult<Staff> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.staff, staff.tenant_id, staff.id, "staff")?;
        let taken = data.staff.values().any(|s| {
            s.id != staff.id
                && s.tenant_id == staff.tenant_id
                && s.email.eq_ignore_ascii_case(&staff.email)
        });
        if taken {
            return Err(RepositoryError::conflict(format!(
                "A staff member with email {} already exists",
                staff.email
            )));
        }
        data.staff.insert(staff.id, staff.clone());
        Ok(staff)
    }

    async fn delete_staff(&self, tenant: TenantId, id: StaffId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.staff, tenant, id, "staff")?;
        data.schedules.retain(|_, s| s.staff_id != id);
        data.staff.remove(&id);
        Ok(())
    }

    async fn count_staff(&self, tenant: TenantId) -> RepositoryResult<u64> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .staff
            .values()
            .filter(|s| s.tenant_id == tenant)
            .count() as u64)
    }

    async fn create_schedule(&self, schedule: StaffSchedule) -> RepositoryResult<StaffSchedule> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.staff, schedule.tenant_id, schedule.staff_id, "staff")?;
        let window = schedule.window();
        if let Some(clash) = data
            .schedules
            .values()
            .find(|s| s.staff_id == schedule.staff_id && s.window().overlaps(&window))
        {
            return Err(RepositoryError::conflict(format!(
                "Shift overlaps existing shift {} ({} to {})",
                clash.id,
                clash.start_time.to_rfc3339(),
                clash.end_time.to_rfc3339()
            )));
        }
        data.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn list_schedules(
        &self,
        tenant: TenantId,
        filter: &ScheduleFilter,
    ) -> RepositoryResult<Vec<StaffSchedule>> {
        self.check_health()?;
        let mut schedules: Vec<StaffSchedule> = self
            .data
            .read()
            .schedules
            .values()
            .filter(|s| s.tenant_id == tenant && filter.matches(s))
            .cloned()
            .collect();
        schedules.sort_by_key(|s| s.start_time);
        Ok(schedules)
    }

    async fn delete_schedule(&self, tenant: TenantId, id: ScheduleId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.schedules, tenant, id, "schedule")?;
        data.schedules.remove(&id);
        Ok(())
    }
}

// ==================== Resources, services, add-ons ====================

#[async_trait]
impl ResourceRepository for LocalRepository {
    async fn create_resource(&self, resource: Resource) -> RepositoryResult<Resource> {
        self.check_health()?;
        self.data.write().resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    async fn get_resource(&self, tenant: TenantId, id: ResourceId) -> RepositoryResult<Resource> {
        self.check_health()?;
        scoped(&self.data.read().resources, tenant, id, "resource")
    }

    async fn list_resources(
        &self,
        tenant: TenantId,
        filter: &ResourceFilter,
    ) -> RepositoryResult<Vec<Resource>> {
        self.check_health()?;
        let mut resources: Vec<Resource> = self
            .data
            .read()
            .resources
            .values()
            .filter(|r| r.tenant_id == tenant && filter.matches(r))
            .cloned()
            .collect();
        resources.sort_by(|a, b| {
            (a.suite_number.unwrap_or(i32::MAX), &a.name)
                .cmp(&(b.suite_number.unwrap_or(i32::MAX), &b.name))
        });
        Ok(resources)
    }

    async fn update_resource(&self, resource: Resource) -> RepositoryResult<Resource> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.resources, resource.tenant_id, resource.id, "resource")?;
        data.resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    async fn delete_resource(&self, tenant: TenantId, id: ResourceId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.resources, tenant, id, "resource")?;
        if data
            .reservations
            .values()
            .any(|r| r.resource_id == Some(id) && r.status.is_active())
        {
            return Err(RepositoryError::conflict(
                "Resource has active reservations and cannot be deleted",
            ));
        }
        for reservation in data.reservations.values_mut() {
            if reservation.resource_id == Some(id) {
                reservation.resource_id = None;
            }
        }
        data.resources.remove(&id);
        Ok(())
    }

    async fn count_resources(&self, tenant: TenantId) -> RepositoryResult<u64> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .resources
            .values()
            .filter(|r| r.tenant_id == tenant)
            .count() as u64)
    }

    async fn create_service(&self, service: Service) -> RepositoryResult<Service> {
        self.check_health()?;
        self.data.write().services.insert(service.id, service.clone());
        Ok(service)
    }

    async fn get_service(&self, tenant: TenantId, id: ServiceId) -> RepositoryResult<Service> {
        self.check_health()?;
        scoped(&self.data.read().services, tenant, id, "service")
    }

    async fn list_services(
        &self,
        tenant: TenantId,
        filter: &ServiceFilter,
    ) -> RepositoryResult<Vec<Service>> {
        self.check_health()?;
        let data = self.data.read();
        data.table_missing(tables::SERVICES)?;
        let mut services: Vec<Service> = data
            .services
            .values()
            .filter(|s| s.tenant_id == tenant && filter.matches(s))
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn update_service(&self, service: Service) -> RepositoryResult<Service> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.services, service.tenant_id, service.id, "service")?;
        data.services.insert(service.id, service.clone());
        Ok(service)
    }

    async fn delete_service(&self, tenant: TenantId, id: ServiceId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.services, tenant, id, "service")?;
        if data.reservations.values().any(|r| r.service_id == id) {
            return Err(RepositoryError::conflict(
                "Service is referenced by reservations and cannot be deleted",
            ));
        }
        data.services.remove(&id);
        Ok(())
    }

    async fn create_add_on(&self, add_on: AddOnService) -> RepositoryResult<AddOnService> {
        self.check_health()?;
        self.data.write().add_ons.insert(add_on.id, add_on.clone());
        Ok(add_on)
    }

    async fn get_add_on(&self, tenant: TenantId, id: AddOnId) -> RepositoryResult<AddOnService> {
        self.check_health()?;
        scoped(&self.data.read().add_ons, tenant, id, "add-on")
    }

    async fn list_add_ons(
        &self,
        tenant: TenantId,
        filter: &AddOnFilter,
    ) -> RepositoryResult<Vec<AddOnService>> {
        self.check_health()?;
        let data = self.data.read();
        data.table_missing(tables::ADD_ONS)?;
        let mut add_ons: Vec<AddOnService> = data
            .add_ons
            .values()
            .filter(|a| a.tenant_id == tenant && filter.matches(a))
            .cloned()
            .collect();
        add_ons.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(add_ons)
    }

    async fn update_add_on(&self, add_on: AddOnService) -> RepositoryResult<AddOnService> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.add_ons, add_on.tenant_id, add_on.id, "add-on")?;
        data.add_ons.insert(add_on.id, add_on.clone());
        Ok(add_on)
    }

    async fn delete_add_on(&self, tenant: TenantId, id: AddOnId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.add_ons, tenant, id, "add-on")?;
        if data.reservation_add_ons.iter().any(|a| a.add_on_id == id) {
            return Err(RepositoryError::conflict(
                "Add-on is attached to reservations and cannot be deleted",
            ));
        }
        data.add_ons.remove(&id);
        Ok(())
    }
}

// ==================== Reservations ====================

#[async_trait]
impl ReservationRepository for LocalRepository {
    async fn find_overlapping_reservations(
        &self,
        tenant: TenantId,
        resource: ResourceId,
        window: TimeWindow,
        exclude: Option<ReservationId>,
    ) -> RepositoryResult<Vec<Reservation>> {
        self.check_health()?;
        Ok(self.data.read().overlapping(tenant, resource, &window, exclude))
    }

    async fn create_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation> {
        self.check_health()?;
        let mut data = self.data.write();
        data.check_occupancy(&reservation)
            .map_err(|e| e.with_operation("create_reservation"))?;
        data.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn get_reservation(
        &self,
        tenant: TenantId,
        id: ReservationId,
    ) -> RepositoryResult<Reservation> {
        self.check_health()?;
        scoped(&self.data.read().reservations, tenant, id, "reservation")
    }

    async fn find_reservation_by_external_id(
        &self,
        tenant: TenantId,
        external_id: &str,
    ) -> RepositoryResult<Option<Reservation>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .reservations
            .values()
            .find(|r| r.tenant_id == tenant && r.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn list_reservations(
        &self,
        tenant: TenantId,
        filter: &ReservationFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Reservation>> {
        let all = self.find_reservations(tenant, filter).await?;
        Ok(page.apply(all))
    }

    async fn find_reservations(
        &self,
        tenant: TenantId,
        filter: &ReservationFilter,
    ) -> RepositoryResult<Vec<Reservation>> {
        self.check_health()?;
        let mut reservations: Vec<Reservation> = self
            .data
            .read()
            .reservations
            .values()
            .filter(|r| r.tenant_id == tenant && filter.matches(r))
            .cloned()
            .collect();
        reservations.sort_by_key(|r| (r.start_date, r.created_at));
        Ok(reservations)
    }

    async fn update_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(
            &data.reservations,
            reservation.tenant_id,
            reservation.id,
            "reservation",
        )?;
        data.check_occupancy(&reservation)
            .map_err(|e| e.with_operation("update_reservation"))?;
        data.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn delete_reservation(
        &self,
        tenant: TenantId,
        id: ReservationId,
    ) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.reservations, tenant, id, "reservation")?;
        data.reservation_add_ons.retain(|a| a.reservation_id != id);
        for invoice in data.invoices.values_mut() {
            if invoice.reservation_id == Some(id) {
                invoice.reservation_id = None;
            }
        }
        data.reservations.remove(&id);
        Ok(())
    }

    async fn add_reservation_add_on(
        &self,
        add_on: ReservationAddOn,
    ) -> RepositoryResult<ReservationAddOn> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(
            &data.reservations,
            add_on.tenant_id,
            add_on.reservation_id,
            "reservation",
        )?;
        ensure_exists(&data.add_ons, add_on.tenant_id, add_on.add_on_id, "add-on")?;
        data.reservation_add_ons.push(add_on.clone());
        Ok(add_on)
    }

    async fn list_reservation_add_ons(
        &self,
        tenant: TenantId,
        reservation: ReservationId,
    ) -> RepositoryResult<Vec<ReservationAddOn>> {
        self.check_health()?;
        let data = self.data.read();
        ensure_exists(&data.reservations, tenant, reservation, "reservation")?;
        Ok(data
            .reservation_add_ons
            .iter()
            .filter(|a| a.reservation_id == reservation)
            .cloned()
            .collect())
    }
}

// ==================== Billing ====================

#[async_trait]
impl BillingRepository for LocalRepository {
    async fn create_invoice(&self, invoice: Invoice) -> RepositoryResult<Invoice> {
        self.check_health()?;
        let mut data = self.data.write();
        ensure_exists(&data.customers, invoice.tenant_id, invoice.customer_id, "customer")?;
        Ok(data.insert_invoice(invoice))
    }

    async fn get_invoice(&self, tenant: TenantId, id: InvoiceId) -> RepositoryResult<Invoice> {
        self.check_health()?;
        scoped(&self.data.read().invoices, tenant, id, "invoice")
    }

    async fn list_invoices(
        &self,
        tenant: TenantId,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Invoice>> {
        let all = self.find_invoices(tenant, filter).await?;
        Ok(page.apply(all))
    }

    async fn find_invoices(
        &self,
        tenant: TenantId,
        filter: &InvoiceFilter,
    ) -> RepositoryResult<Vec<Invoice>> {
        self.check_health()?;
        let mut invoices: Vec<Invoice> = self
            .data
            .read()
            .invoices
            .values()
            .filter(|i| i.tenant_id == tenant && filter.matches(i))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then_with(|| b.invoice_number.cmp(&a.invoice_number))
        });
        Ok(invoices)
    }

    async fn record_payment(&self, payment: Payment) -> RepositoryResult<PaymentReceipt> {
        self.check_health()?;
        self.data.write().settle(payment)
    }

    async fn list_payments(
        &self,
        tenant: TenantId,
        filter: &PaymentFilter,
    ) -> RepositoryResult<Vec<Payment>> {
        self.check_health()?;
        let mut payments: Vec<Payment> = self
            .data
            .read()
            .payments
            .iter()
            .filter(|p| p.tenant_id == tenant && filter.matches(p))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(payments)
    }

    async fn checkout(&self, plan: CheckoutPlan) -> RepositoryResult<CheckoutResult> {
        self.check_health()?;
        let tenant = plan.invoice.tenant_id;
        let mut data = self.data.write();

        if let Some(key) = &plan.idempotency {
            if let Some(stored) = data.stored_checkout(tenant, key)? {
                return Ok(stored);
            }
        }

        ensure_exists(&data.customers, tenant, plan.invoice.customer_id, "customer")?;
        if let Some(reservation) = plan.invoice.reservation_id {
            ensure_exists(&data.reservations, tenant, reservation, "reservation")?;
        }

        // Validate the payment against the draft before touching any table so
        // a rejected checkout leaves nothing behind.
        let mut trial = plan.invoice.clone();
        trial
            .apply_payment(plan.payment.amount)
            .map_err(RepositoryError::validation)?;

        let invoice = data.insert_invoice(plan.invoice);
        let receipt = data.settle(Payment {
            invoice_id: invoice.id,
            ..plan.payment
        })?;
        let result = CheckoutResult {
            invoice: receipt.invoice,
            payment: receipt.payment,
            transaction: receipt.transaction,
            replayed: false,
        };

        if let Some(key) = plan.idempotency {
            data.idempotency
                .insert((tenant, key.key), (key.fingerprint, result.clone()));
        }
        Ok(result)
    }

    async fn find_checkout(
        &self,
        tenant: TenantId,
        key: &IdempotencyKey,
    ) -> RepositoryResult<Option<CheckoutResult>> {
        self.check_health()?;
        self.data.read().stored_checkout(tenant, key)
    }

    async fn list_financial_transactions(
        &self,
        tenant: TenantId,
        invoice: Option<InvoiceId>,
    ) -> RepositoryResult<Vec<FinancialTransaction>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .transactions
            .iter()
            .filter(|t| t.tenant_id == tenant && invoice.is_none_or(|id| t.invoice_id == id))
            .cloned()
            .collect())
    }
}

// ==================== Usage ====================

#[async_trait]
impl UsageRepository for LocalRepository {
    async fn record_usage(&self, usage: TenantUsage) -> RepositoryResult<()> {
        self.check_health()?;
        self.data.write().usage.push(usage);
        Ok(())
    }

    async fn list_usage(
        &self,
        tenant: TenantId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> RepositoryResult<Vec<TenantUsage>> {
        self.check_health()?;
        let data = self.data.read();
        data.table_missing(tables::TENANT_USAGE)?;
        Ok(data
            .usage
            .iter()
            .rev()
            .filter(|u| u.tenant_id == tenant && since.is_none_or(|s| u.recorded_at >= s))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn usage_summary(
        &self,
        tenant: TenantId,
        since: Option<DateTime<Utc>>,
    ) -> RepositoryResult<UsageSummary> {
        self.check_health()?;
        let data = self.data.read();
        data.table_missing(tables::TENANT_USAGE)?;
        let records: Vec<TenantUsage> = data
            .usage
            .iter()
            .filter(|u| u.tenant_id == tenant && since.is_none_or(|s| u.recorded_at >= s))
            .cloned()
            .collect();
        Ok(UsageSummary::from_records(tenant, since, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time::parse_timestamp;

    struct Fixture {
        repo: LocalRepository,
        tenant: TenantId,
        customer: Customer,
        pet: Pet,
        service: Service,
        resource: Resource,
    }

    async fn fixture() -> Fixture {
        let repo = LocalRepository::new();
        let tenant = repo
            .create_tenant(Tenant {
                id: TenantId::generate(),
                name: "Paws".into(),
                slug: "paws".into(),
                subscription_tier: SubscriptionTier::Professional,
                features: vec![],
                max_customers: None,
                max_staff: None,
                max_resources: None,
                rate_limit_per_minute: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap()
            .id;
        let customer = repo
            .create_customer(
                CreateCustomer {
                    first_name: "Jo".into(),
                    last_name: "Doe".into(),
                    email: Some("jo@example.com".into()),
                    ..Default::default()
                }
                .into_customer(tenant),
            )
            .await
            .unwrap();
        let pet = repo
            .create_pet(
                CreatePet {
                    customer_id: customer.id,
                    name: "Rex".into(),
                    pet_type: PetType::Dog,
                    breed: None,
                    birthdate: None,
                    weight: None,
                    medical_notes: None,
                    behavior_notes: None,
                    allergies: None,
                    medications: None,
                    pet_icons: vec![],
                }
                .into_pet(tenant),
            )
            .await
            .unwrap();
        let service = repo
            .create_service(
                CreateService {
                    name: "Boarding".into(),
                    description: None,
                    service_category: ServiceCategory::Boarding,
                    price: 50.0,
                    duration_minutes: None,
                }
                .into_service(tenant),
            )
            .await
            .unwrap();
        let resource = repo
            .create_resource(
                CreateResource {
                    name: "Suite 1".into(),
                    resource_type: ResourceType::Vip,
                    suite_number: Some(1),
                    description: None,
                    capacity: 1,
                }
                .into_resource(tenant),
            )
            .await
            .unwrap();
        Fixture {
            repo,
            tenant,
            customer,
            pet,
            service,
            resource,
        }
    }

    fn booking(f: &Fixture, start: &str, end: &str) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: ReservationId::generate(),
            tenant_id: f.tenant,
            customer_id: f.customer.id,
            pet_id: f.pet.id,
            service_id: f.service.id,
            resource_id: Some(f.resource.id),
            start_date: parse_timestamp(start).unwrap(),
            end_date: parse_timestamp(end).unwrap(),
            status: ReservationStatus::Confirmed,
            price: 100.0,
            notes: None,
            staff_notes: None,
            external_id: None,
            check_in_at: None,
            check_out_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = LocalRepository::new();
        assert!(repo.health_check().await.unwrap());

        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        assert!(repo.list_tenants().await.is_err());
    }

    #[tokio::test]
    async fn test_overlapping_reservation_is_rejected_and_not_stored() {
        let f = fixture().await;
        f.repo
            .create_reservation(booking(&f, "2024-07-01", "2024-07-05"))
            .await
            .unwrap();

        let err = f
            .repo
            .create_reservation(booking(&f, "2024-07-04", "2024-07-06"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ConflictError { .. }));
        assert_eq!(f.repo.reservation_count(), 1);

        // Back-to-back stays share the boundary instant.
        f.repo
            .create_reservation(booking(&f, "2024-07-05", "2024-07-07"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_reservation_frees_resource() {
        let f = fixture().await;
        let mut first = f
            .repo
            .create_reservation(booking(&f, "2024-07-01", "2024-07-05"))
            .await
            .unwrap();
        first.status = ReservationStatus::Cancelled;
        f.repo.update_reservation(first).await.unwrap();

        f.repo
            .create_reservation(booking(&f, "2024-07-02", "2024-07-03"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_rechecks_overlap_excluding_itself() {
        let f = fixture().await;
        let mut a = f
            .repo
            .create_reservation(booking(&f, "2024-07-01", "2024-07-03"))
            .await
            .unwrap();
        f.repo
            .create_reservation(booking(&f, "2024-07-05", "2024-07-08"))
            .await
            .unwrap();

        a.end_date = parse_timestamp("2024-07-04").unwrap();
        let a = f.repo.update_reservation(a).await.unwrap();

        let mut moved = a.clone();
        moved.end_date = parse_timestamp("2024-07-06").unwrap();
        assert!(f.repo.update_reservation(moved).await.is_err());
        let stored = f.repo.get_reservation(f.tenant, a.id).await.unwrap();
        assert_eq!(stored.end_date, a.end_date);
    }

    #[tokio::test]
    async fn test_rows_of_other_tenants_are_invisible() {
        let f = fixture().await;
        let other = TenantId::generate();
        assert!(f
            .repo
            .get_customer(other, f.customer.id)
            .await
            .unwrap_err()
            .is_not_found());
        let page = f
            .repo
            .list_customers(other, &CustomerFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(f
            .repo
            .list_pets(other, &PetFilter::default())
            .await
            .unwrap()
            .is_empty());

        let stay = f
            .repo
            .create_reservation(booking(&f, "2024-07-01", "2024-07-03"))
            .await
            .unwrap();
        let invoice = f
            .repo
            .create_invoice(Invoice::draft(
                f.tenant,
                f.customer.id,
                Some(stay.id),
                vec![NewLineItem {
                    item_type: LineItemType::Service,
                    description: "Boarding".into(),
                    quantity: 2,
                    unit_price: 50.0,
                    reference_id: None,
                }],
                0.0,
            ))
            .await
            .unwrap();
        assert!(f.repo.get_reservation(other, stay.id).await.unwrap_err().is_not_found());
        assert!(f.repo.get_resource(other, f.resource.id).await.unwrap_err().is_not_found());
        assert!(f.repo.get_service(other, f.service.id).await.unwrap_err().is_not_found());
        assert!(f.repo.get_invoice(other, invoice.id).await.unwrap_err().is_not_found());
        assert!(f
            .repo
            .find_reservations(other, &ReservationFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(f
            .repo
            .list_resources(other, &ResourceFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(f
            .repo
            .list_services(other, &ServiceFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(f
            .repo
            .find_invoices(other, &InvoiceFilter::default())
            .await
            .unwrap()
            .is_empty());
        let window = TimeWindow::new(
            parse_timestamp("2024-07-01").unwrap(),
            parse_timestamp("2024-07-02").unwrap(),
        )
        .unwrap();
        assert!(f
            .repo
            .find_overlapping_reservations(other, f.resource.id, window, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_referenced_rows_cannot_be_deleted() {
        let f = fixture().await;
        let stay = f
            .repo
            .create_reservation(booking(&f, "2024-07-01", "2024-07-03"))
            .await
            .unwrap();
        let add_on = f
            .repo
            .create_add_on(
                CreateAddOn {
                    service_id: None,
                    name: "Nail trim".into(),
                    description: None,
                    price: 15.0,
                }
                .into_add_on(f.tenant),
            )
            .await
            .unwrap();
        f.repo
            .add_reservation_add_on(ReservationAddOn {
                id: ReservationAddOnId::generate(),
                tenant_id: f.tenant,
                reservation_id: stay.id,
                add_on_id: add_on.id,
                quantity: 1,
                unit_price: add_on.price,
                notes: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(matches!(
            f.repo.delete_add_on(f.tenant, add_on.id).await,
            Err(RepositoryError::ConflictError { .. })
        ));
        f.repo.delete_reservation(f.tenant, stay.id).await.unwrap();
        f.repo.delete_add_on(f.tenant, add_on.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_customer_with_invoices_cannot_be_deleted() {
        let f = fixture().await;
        f.repo
            .create_invoice(Invoice::draft(
                f.tenant,
                f.customer.id,
                None,
                vec![NewLineItem {
                    item_type: LineItemType::Product,
                    description: "Treats".into(),
                    quantity: 1,
                    unit_price: 5.0,
                    reference_id: None,
                }],
                0.0,
            ))
            .await
            .unwrap();
        assert!(matches!(
            f.repo.delete_customer(f.tenant, f.customer.id).await,
            Err(RepositoryError::ConflictError { .. })
        ));
        assert!(f.repo.get_customer(f.tenant, f.customer.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_deleting_resource_detaches_past_stays() {
        let f = fixture().await;
        let mut stay = f
            .repo
            .create_reservation(booking(&f, "2024-07-01", "2024-07-03"))
            .await
            .unwrap();
        assert!(f.repo.delete_resource(f.tenant, f.resource.id).await.is_err());

        stay.status = ReservationStatus::CheckedOut;
        f.repo.update_reservation(stay.clone()).await.unwrap();
        f.repo.delete_resource(f.tenant, f.resource.id).await.unwrap();

        let stored = f.repo.get_reservation(f.tenant, stay.id).await.unwrap();
        assert_eq!(stored.resource_id, None);
    }

    #[tokio::test]
    async fn test_duplicate_customer_email_conflicts() {
        let f = fixture().await;
        let dup = CreateCustomer {
            first_name: "Other".into(),
            last_name: "Person".into(),
            email: Some("JO@example.com".into()),
            ..Default::default()
        }
        .into_customer(f.tenant);
        assert!(matches!(
            f.repo.create_customer(dup).await,
            Err(RepositoryError::ConflictError { .. })
        ));
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential_per_tenant_and_day() {
        let f = fixture().await;
        let draft = || {
            Invoice::draft(
                f.tenant,
                f.customer.id,
                None,
                vec![NewLineItem {
                    item_type: LineItemType::Product,
                    description: "Treats".into(),
                    quantity: 1,
                    unit_price: 5.0,
                    reference_id: None,
                }],
                0.0,
            )
        };
        let a = f.repo.create_invoice(draft()).await.unwrap();
        let b = f.repo.create_invoice(draft()).await.unwrap();
        assert!(a.invoice_number.ends_with("-0001"));
        assert!(b.invoice_number.ends_with("-0002"));
        assert!(a.invoice_number.starts_with("INV-"));
    }

    #[tokio::test]
    async fn test_checkout_is_idempotent_and_atomic() {
        let f = fixture().await;
        let invoice = Invoice::draft(
            f.tenant,
            f.customer.id,
            None,
            vec![NewLineItem {
                item_type: LineItemType::Service,
                description: "Bath".into(),
                quantity: 1,
                unit_price: 40.0,
                reference_id: None,
            }],
            0.0744,
        );
        let payment = NewPayment {
            amount: invoice.total,
            method: PaymentMethod::Cash,
            reference: None,
            notes: None,
        }
        .into_payment(&invoice);
        let plan = CheckoutPlan {
            idempotency: Some(IdempotencyKey {
                key: "k1".into(),
                fingerprint: "f1".into(),
            }),
            invoice,
            payment,
        };

        let first = f.repo.checkout(plan.clone()).await.unwrap();
        assert!(!first.replayed);
        assert_eq!(first.invoice.status, InvoiceStatus::Paid);

        let second = f.repo.checkout(plan.clone()).await.unwrap();
        assert!(second.replayed);
        assert_eq!(second.invoice.id, first.invoice.id);

        let mut reused = plan.clone();
        reused.idempotency = Some(IdempotencyKey {
            key: "k1".into(),
            fingerprint: "other".into(),
        });
        assert!(matches!(
            f.repo.checkout(reused).await,
            Err(RepositoryError::ConflictError { .. })
        ));

        // An overpaying checkout writes nothing.
        let mut bad = plan;
        bad.idempotency = None;
        bad.invoice.id = InvoiceId::generate();
        bad.payment.amount = bad.invoice.total + 10.0;
        assert!(f.repo.checkout(bad).await.is_err());
        let invoices = f
            .repo
            .find_invoices(f.tenant, &InvoiceFilter::default())
            .await
            .unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(
            f.repo
                .list_financial_transactions(f.tenant, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_missing_table_reports_schema_error() {
        let f = fixture().await;
        f.repo.simulate_missing_table(tables::ADD_ONS);
        assert!(matches!(
            f.repo.list_add_ons(f.tenant, &AddOnFilter::default()).await,
            Err(RepositoryError::SchemaError { .. })
        ));
    }

    #[tokio::test]
    async fn test_overlapping_shift_is_rejected() {
        let f = fixture().await;
        let staff = f
            .repo
            .create_staff(Staff {
                id: StaffId::generate(),
                tenant_id: f.tenant,
                first_name: "Sam".into(),
                last_name: "Keeper".into(),
                email: "sam@example.com".into(),
                phone: None,
                role: StaffRole::Staff,
                department: None,
                position: None,
                password_hash: None,
                is_active: true,
                last_login_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        let shift = |start: &str, end: &str| StaffSchedule {
            id: ScheduleId::generate(),
            tenant_id: f.tenant,
            staff_id: staff.id,
            start_time: parse_timestamp(start).unwrap(),
            end_time: parse_timestamp(end).unwrap(),
            notes: None,
            created_at: Utc::now(),
        };
        f.repo
            .create_schedule(shift("2024-07-01T08:00:00Z", "2024-07-01T16:00:00Z"))
            .await
            .unwrap();
        assert!(f
            .repo
            .create_schedule(shift("2024-07-01T15:00:00Z", "2024-07-01T20:00:00Z"))
            .await
            .is_err());
    }
}
