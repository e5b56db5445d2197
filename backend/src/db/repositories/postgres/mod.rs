//! Postgres repository implementation using Diesel.
//!
//! Implements every repository trait against the schema created by the
//! embedded migrations in `migrations/`.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
//!
//! ## Occupancy
//!
//! Reservation writes lock the resource row (`SELECT ... FOR UPDATE`) before
//! looking for overlapping active reservations, so two transactions booking
//! the same kennel serialise on that row and the second one sees the first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::{count_star, exists};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::task;
use uuid::Uuid;

use crate::db::repository::*;
use crate::models::*;

mod models;
mod schema;

use models::*;
use schema::*;
// The `staff` table shares its name with `crate::models::staff`.
use schema::staff;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables (see module docs).
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;
        let defaults = Self::default();

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    pub failed_queries: u64,
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection(format!(
                    "{} (max_size={})",
                    e, config.max_pool_size
                ))
                .with_operation("create_pool")
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::from(e).with_operation("get_connection_for_migrations")
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal(format!("Migration failed: {}", e))
                .with_operation("run_migrations")
        })?;
        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// Retries up to `max_retries` times with exponential backoff when the
    /// error is retryable (pool exhaustion, dropped connections,
    /// serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::from(e).with_operation("get_connection");
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        tracing::debug!(attempt, error = %e, "retrying database operation");
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal(format!("Task join error: {}", e))
                .with_operation("spawn_blocking")
        })?
    }

    /// Current pool state and query counters.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Returns (is_healthy, latency_ms, error_message).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        let elapsed = || Some(start.elapsed().as_millis() as u64);
        match self.health_check().await {
            Ok(true) => (true, elapsed(), None),
            Ok(false) => (false, elapsed(), Some("Health check returned false".to_string())),
            Err(e) => (false, elapsed(), Some(e.to_string())),
        }
    }
}

// ==================== Query helpers ====================

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn active_statuses() -> Vec<&'static str> {
    ReservationStatus::ACTIVE.iter().map(|s| s.as_str()).collect()
}

fn found<T>(result: QueryResult<T>, entity: &str, id: impl ToString) -> RepositoryResult<T> {
    match result {
        Ok(v) => Ok(v),
        Err(diesel::result::Error::NotFound) => Err(RepositoryError::entity_not_found(entity, id)),
        Err(e) => Err(e.into()),
    }
}

fn affected(count: usize, entity: &str, id: impl ToString) -> RepositoryResult<()> {
    if count == 0 {
        return Err(RepositoryError::entity_not_found(entity, id));
    }
    Ok(())
}

fn customer_exists(conn: &mut PgConnection, tenant: Uuid, id: Uuid) -> RepositoryResult<()> {
    let present: bool = diesel::select(exists(
        customers::table.filter(customers::id.eq(id).and(customers::tenant_id.eq(tenant))),
    ))
    .get_result(conn)?;
    if !present {
        return Err(RepositoryError::entity_not_found("customer", id));
    }
    Ok(())
}

fn reservation_exists(conn: &mut PgConnection, tenant: Uuid, id: Uuid) -> RepositoryResult<()> {
    let present: bool = diesel::select(exists(
        reservations::table
            .filter(reservations::id.eq(id).and(reservations::tenant_id.eq(tenant))),
    ))
    .get_result(conn)?;
    if !present {
        return Err(RepositoryError::entity_not_found("reservation", id));
    }
    Ok(())
}

fn customer_query(
    tenant: Uuid,
    filter: &CustomerFilter,
) -> customers::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = customers::table
        .filter(customers::tenant_id.eq(tenant))
        .into_boxed();
    if let Some(active) = filter.is_active {
        query = query.filter(customers::is_active.eq(active));
    }
    if let Some(needle) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(needle.trim());
        query = query.filter(
            customers::first_name
                .ilike(pattern.clone())
                .or(customers::last_name.ilike(pattern.clone()))
                .or(customers::email.assume_not_null().ilike(pattern.clone()))
                .or(customers::phone.assume_not_null().ilike(pattern)),
        );
    }
    query
}

fn reservation_query(
    tenant: Uuid,
    filter: &ReservationFilter,
) -> reservations::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = reservations::table
        .filter(reservations::tenant_id.eq(tenant))
        .into_boxed();
    if let Some(status) = filter.status {
        query = query.filter(reservations::status.eq(status.as_str()));
    }
    if let Some(customer) = filter.customer_id {
        query = query.filter(reservations::customer_id.eq(customer.value()));
    }
    if let Some(pet) = filter.pet_id {
        query = query.filter(reservations::pet_id.eq(pet.value()));
    }
    if let Some(resource) = filter.resource_id {
        query = query.filter(reservations::resource_id.eq(resource.value()));
    }
    if let Some(window) = filter.window {
        query = query.filter(
            reservations::start_date
                .lt(window.end)
                .and(reservations::end_date.gt(window.start)),
        );
    }
    query
}

fn invoice_query(
    tenant: Uuid,
    filter: &InvoiceFilter,
) -> invoices::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = invoices::table
        .filter(invoices::tenant_id.eq(tenant))
        .into_boxed();
    if let Some(customer) = filter.customer_id {
        query = query.filter(invoices::customer_id.eq(customer.value()));
    }
    if let Some(reservation) = filter.reservation_id {
        query = query.filter(invoices::reservation_id.eq(reservation.value()));
    }
    if let Some(status) = filter.status {
        query = query.filter(invoices::status.eq(status.as_str()));
    }
    if let Some(window) = filter.issued {
        query = query.filter(
            invoices::issue_date
                .ge(window.start)
                .and(invoices::issue_date.lt(window.end)),
        );
    }
    query
}

/// Active reservations holding `resource` during `window`.
fn overlapping(
    conn: &mut PgConnection,
    tenant: Uuid,
    resource: Uuid,
    window: TimeWindow,
    exclude: Option<Uuid>,
) -> RepositoryResult<Vec<Reservation>> {
    let mut query = reservations::table
        .filter(reservations::tenant_id.eq(tenant))
        .filter(reservations::resource_id.eq(resource))
        .filter(reservations::status.eq_any(active_statuses()))
        .filter(reservations::start_date.lt(window.end))
        .filter(reservations::end_date.gt(window.start))
        .into_boxed();
    if let Some(id) = exclude {
        query = query.filter(reservations::id.ne(id));
    }
    let rows = query
        .order(reservations::start_date.asc())
        .select(ReservationRow::as_select())
        .load(conn)?;
    decode_all(rows)
}

/// Lock the reservation's resource and fail if another active reservation
/// overlaps it. Must run inside the transaction that writes the reservation.
fn check_occupancy(conn: &mut PgConnection, reservation: &Reservation) -> RepositoryResult<()> {
    let Some(resource) = reservation.resource_id else {
        return Ok(());
    };
    if !reservation.status.is_active() {
        return Ok(());
    }
    let tenant = reservation.tenant_id.value();

    found(
        resources::table
            .filter(resources::id.eq(resource.value()))
            .filter(resources::tenant_id.eq(tenant))
            .select(resources::id)
            .for_update()
            .first::<Uuid>(conn),
        "resource",
        resource,
    )?;

    let clashes = overlapping(
        conn,
        tenant,
        resource.value(),
        reservation.window(),
        Some(reservation.id.value()),
    )?;
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

fn load_line_items(
    conn: &mut PgConnection,
    invoice_ids: &[Uuid],
) -> RepositoryResult<HashMap<Uuid, Vec<InvoiceLineItem>>> {
    let rows = invoice_line_items::table
        .filter(invoice_line_items::invoice_id.eq_any(invoice_ids))
        .select(LineItemRow::as_select())
        .load(conn)?;
    let mut grouped: HashMap<Uuid, Vec<InvoiceLineItem>> = HashMap::new();
    for row in rows {
        let invoice = row.invoice_id;
        grouped
            .entry(invoice)
            .or_default()
            .push(InvoiceLineItem::try_from(row)?);
    }
    Ok(grouped)
}

fn attach_line_items(
    conn: &mut PgConnection,
    rows: Vec<InvoiceRow>,
) -> RepositoryResult<Vec<Invoice>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = load_line_items(conn, &ids)?;
    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_invoice(lines)
        })
        .collect()
}

fn load_invoice(conn: &mut PgConnection, tenant: Uuid, id: Uuid) -> RepositoryResult<Invoice> {
    let row = found(
        invoices::table
            .filter(invoices::id.eq(id))
            .filter(invoices::tenant_id.eq(tenant))
            .select(InvoiceRow::as_select())
            .first(conn),
        "invoice",
        id,
    )?;
    let mut invoices = attach_line_items(conn, vec![row])?;
    invoices
        .pop()
        .ok_or_else(|| RepositoryError::entity_not_found("invoice", id))
}

/// Next `INV-YYYYMMDD-NNNN` for the tenant. Locks the tenant row so
/// concurrent invoice inserts for one tenant are numbered one at a time.
fn next_invoice_number(
    conn: &mut PgConnection,
    tenant: Uuid,
    issued: DateTime<Utc>,
) -> RepositoryResult<String> {
    found(
        tenants::table
            .filter(tenants::id.eq(tenant))
            .select(tenants::id)
            .for_update()
            .first::<Uuid>(conn),
        "tenant",
        tenant,
    )?;
    let date = issued.date_naive();
    let prefix = format!("INV-{}-%", date.format("%Y%m%d"));
    let issued_today: i64 = invoices::table
        .filter(invoices::tenant_id.eq(tenant))
        .filter(invoices::invoice_number.like(prefix))
        .select(count_star())
        .first(conn)?;
    Ok(format_invoice_number(date, issued_today as u32 + 1))
}

fn insert_invoice(conn: &mut PgConnection, mut invoice: Invoice) -> RepositoryResult<Invoice> {
    let tenant = invoice.tenant_id.value();
    customer_exists(conn, tenant, invoice.customer_id.value())?;
    if let Some(reservation) = invoice.reservation_id {
        reservation_exists(conn, tenant, reservation.value())?;
    }
    invoice.invoice_number = next_invoice_number(conn, tenant, invoice.issue_date)?;

    diesel::insert_into(invoices::table)
        .values(InvoiceRow::from(&invoice))
        .execute(conn)?;
    let lines: Vec<LineItemRow> = invoice.line_items.iter().map(LineItemRow::from).collect();
    if !lines.is_empty() {
        diesel::insert_into(invoice_line_items::table)
            .values(&lines)
            .execute(conn)?;
    }
    Ok(invoice)
}

/// Apply a payment to its invoice under a row lock and write the audit row.
fn settle(conn: &mut PgConnection, payment: Payment) -> RepositoryResult<PaymentReceipt> {
    let tenant = payment.tenant_id.value();
    let invoice_id = payment.invoice_id.value();
    found(
        invoices::table
            .filter(invoices::id.eq(invoice_id))
            .filter(invoices::tenant_id.eq(tenant))
            .select(invoices::id)
            .for_update()
            .first::<Uuid>(conn),
        "invoice",
        invoice_id,
    )?;
    let mut invoice = load_invoice(conn, tenant, invoice_id)?;
    invoice
        .apply_payment(payment.amount)
        .map_err(RepositoryError::validation)?;
    let transaction = FinancialTransaction::for_payment(&invoice, &payment);

    diesel::update(invoices::table.filter(invoices::id.eq(invoice_id)))
        .set((
            invoices::amount_paid.eq(invoice.amount_paid),
            invoices::status.eq(invoice.status.as_str()),
            invoices::updated_at.eq(invoice.updated_at),
        ))
        .execute(conn)?;
    diesel::insert_into(payments::table)
        .values(PaymentRow::from(&payment))
        .execute(conn)?;
    diesel::insert_into(financial_transactions::table)
        .values(TransactionRow::from(&transaction))
        .execute(conn)?;

    Ok(PaymentReceipt {
        invoice,
        payment,
        transaction,
    })
}

fn schedule_overlaps(conn: &mut PgConnection, schedule: &StaffSchedule) -> RepositoryResult<bool> {
    Ok(diesel::select(exists(
        staff_schedules::table
            .filter(staff_schedules::tenant_id.eq(schedule.tenant_id.value()))
            .filter(staff_schedules::staff_id.eq(schedule.staff_id.value()))
            .filter(staff_schedules::start_time.lt(schedule.end_time))
            .filter(staff_schedules::end_time.gt(schedule.start_time)),
    ))
    .get_result(conn)?)
}

// ==================== Tenants ====================

#[async_trait]
impl TenantRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn create_tenant(&self, tenant: Tenant) -> RepositoryResult<Tenant> {
        self.with_conn(move |conn| {
            let row = diesel::insert_into(tenants::table)
                .values(TenantRow::from(&tenant))
                .returning(TenantRow::as_returning())
                .get_result(conn)
                .map_err(|e| match RepositoryError::from(e) {
                    RepositoryError::ConflictError { .. } => RepositoryError::conflict(format!(
                        "Tenant slug '{}' is already taken",
                        tenant.slug
                    )),
                    other => other,
                })?;
            Tenant::try_from(row)
        })
        .await
    }

    async fn get_tenant(&self, id: TenantId) -> RepositoryResult<Tenant> {
        self.with_conn(move |conn| {
            let row = found(
                tenants::table
                    .find(id.value())
                    .select(TenantRow::as_select())
                    .first(conn),
                "tenant",
                id,
            )?;
            Tenant::try_from(row)
        })
        .await
    }

    async fn get_tenant_by_slug(&self, slug: &str) -> RepositoryResult<Tenant> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            let row = found(
                tenants::table
                    .filter(tenants::slug.eq(&slug))
                    .select(TenantRow::as_select())
                    .first(conn),
                "tenant",
                &slug,
            )?;
            Tenant::try_from(row)
        })
        .await
    }

    async fn list_tenants(&self) -> RepositoryResult<Vec<Tenant>> {
        self.with_conn(|conn| {
            let rows = tenants::table
                .order(tenants::name.asc())
                .select(TenantRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn update_tenant(&self, tenant: Tenant) -> RepositoryResult<Tenant> {
        self.with_conn(move |conn| {
            let row = found(
                diesel::update(tenants::table.find(tenant.id.value()))
                    .set(TenantRow::from(&tenant))
                    .returning(TenantRow::as_returning())
                    .get_result(conn),
                "tenant",
                tenant.id,
            )?;
            Tenant::try_from(row)
        })
        .await
    }
}

// ==================== Customers & pets ====================

#[async_trait]
impl CustomerRepository for PostgresRepository {
    async fn create_customer(&self, customer: Customer) -> RepositoryResult<Customer> {
        self.with_conn(move |conn| {
            let row = diesel::insert_into(customers::table)
                .values(CustomerRow::from(&customer))
                .returning(CustomerRow::as_returning())
                .get_result(conn)
                .map_err(|e| match RepositoryError::from(e) {
                    RepositoryError::ConflictError { .. } => RepositoryError::conflict(format!(
                        "A customer with email {} already exists",
                        customer.email.as_deref().unwrap_or_default()
                    )),
                    other => other,
                })?;
            Ok(Customer::from(row))
        })
        .await
    }

    async fn get_customer(&self, tenant: TenantId, id: CustomerId) -> RepositoryResult<Customer> {
        self.with_conn(move |conn| {
            let row = found(
                customers::table
                    .filter(customers::id.eq(id.value()))
                    .filter(customers::tenant_id.eq(tenant.value()))
                    .select(CustomerRow::as_select())
                    .first(conn),
                "customer",
                id,
            )?;
            Ok(Customer::from(row))
        })
        .await
    }

    async fn list_customers(
        &self,
        tenant: TenantId,
        filter: &CustomerFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Customer>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = customer_query(tenant.value(), &filter)
                .select(count_star())
                .first(conn)?;
            let rows = customer_query(tenant.value(), &filter)
                .order((customers::last_name.asc(), customers::first_name.asc()))
                .limit(page.limit as i64)
                .offset(page.offset() as i64)
                .select(CustomerRow::as_select())
                .load(conn)?;
            Ok(Page {
                items: rows.into_iter().map(Customer::from).collect(),
                pagination: Pagination::new(page, total as u64),
            })
        })
        .await
    }

    async fn find_customer_by_email(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Option<Customer>> {
        let email = email.trim().to_lowercase();
        self.with_conn(move |conn| {
            let row = customers::table
                .filter(customers::tenant_id.eq(tenant.value()))
                .filter(customers::email.eq(&email))
                .select(CustomerRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Customer::from))
        })
        .await
    }

    async fn update_customer(&self, customer: Customer) -> RepositoryResult<Customer> {
        self.with_conn(move |conn| {
            let row = found(
                diesel::update(
                    customers::table
                        .filter(customers::id.eq(customer.id.value()))
                        .filter(customers::tenant_id.eq(customer.tenant_id.value())),
                )
                .set(CustomerRow::from(&customer))
                .returning(CustomerRow::as_returning())
                .get_result(conn),
                "customer",
                customer.id,
            )?;
            Ok(Customer::from(row))
        })
        .await
    }

    async fn delete_customer(&self, tenant: TenantId, id: CustomerId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                customer_exists(tx, tenant.value(), id.value())?;
                let has_reservations: bool = diesel::select(exists(
                    reservations::table.filter(reservations::customer_id.eq(id.value())),
                ))
                .get_result(tx)?;
                if has_reservations {
                    return Err(RepositoryError::conflict(
                        "Customer has reservations and cannot be permanently deleted",
                    ));
                }
                let has_invoices: bool = diesel::select(exists(
                    invoices::table.filter(invoices::customer_id.eq(id.value())),
                ))
                .get_result(tx)?;
                if has_invoices {
                    return Err(RepositoryError::conflict(
                        "Customer has invoices and cannot be permanently deleted",
                    ));
                }
                diesel::delete(customers::table.filter(customers::id.eq(id.value())))
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn count_customers(&self, tenant: TenantId) -> RepositoryResult<u64> {
        self.with_conn(move |conn| {
            let n: i64 = customers::table
                .filter(customers::tenant_id.eq(tenant.value()))
                .select(count_star())
                .first(conn)?;
            Ok(n as u64)
        })
        .await
    }

    async fn create_pet(&self, pet: Pet) -> RepositoryResult<Pet> {
        self.with_conn(move |conn| {
            customer_exists(conn, pet.tenant_id.value(), pet.customer_id.value())?;
            let row = diesel::insert_into(pets::table)
                .values(PetRow::from(&pet))
                .returning(PetRow::as_returning())
                .get_result(conn)?;
            Pet::try_from(row)
        })
        .await
    }

    async fn get_pet(&self, tenant: TenantId, id: PetId) -> RepositoryResult<Pet> {
        self.with_conn(move |conn| {
            let row = found(
                pets::table
                    .filter(pets::id.eq(id.value()))
                    .filter(pets::tenant_id.eq(tenant.value()))
                    .select(PetRow::as_select())
                    .first(conn),
                "pet",
                id,
            )?;
            Pet::try_from(row)
        })
        .await
    }

    async fn list_pets(&self, tenant: TenantId, filter: &PetFilter) -> RepositoryResult<Vec<Pet>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = pets::table
                .filter(pets::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(customer) = filter.customer_id {
                query = query.filter(pets::customer_id.eq(customer.value()));
            }
            if let Some(pet_type) = filter.pet_type {
                query = query.filter(pets::pet_type.eq(pet_type.as_str()));
            }
            if let Some(needle) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = like_pattern(needle.trim());
                query = query.filter(
                    pets::name
                        .ilike(pattern.clone())
                        .or(pets::breed.assume_not_null().ilike(pattern)),
                );
            }
            let rows = query
                .order(pets::name.asc())
                .select(PetRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn update_pet(&self, pet: Pet) -> RepositoryResult<Pet> {
        self.with_conn(move |conn| {
            let row = found(
                diesel::update(
                    pets::table
                        .filter(pets::id.eq(pet.id.value()))
                        .filter(pets::tenant_id.eq(pet.tenant_id.value())),
                )
                .set(PetRow::from(&pet))
                .returning(PetRow::as_returning())
                .get_result(conn),
                "pet",
                pet.id,
            )?;
            Pet::try_from(row)
        })
        .await
    }

    async fn delete_pet(&self, tenant: TenantId, id: PetId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let has_reservations: bool = diesel::select(exists(
                    reservations::table.filter(reservations::pet_id.eq(id.value())),
                ))
                .get_result(tx)?;
                let present: bool = diesel::select(exists(
                    pets::table.filter(pets::id.eq(id.value()).and(pets::tenant_id.eq(tenant.value()))),
                ))
                .get_result(tx)?;
                if !present {
                    return Err(RepositoryError::entity_not_found("pet", id));
                }
                if has_reservations {
                    return Err(RepositoryError::conflict(
                        "Pet has reservations and cannot be permanently deleted",
                    ));
                }
                diesel::delete(pets::table.filter(pets::id.eq(id.value()))).execute(tx)?;
                Ok(())
            })
        })
        .await
    }
}

// ==================== Staff ====================

#[async_trait]
impl StaffRepository for PostgresRepository {
    async fn create_staff(&self, staff_member: Staff) -> RepositoryResult<Staff> {
        self.with_conn(move |conn| {
            let row = diesel::insert_into(staff::table)
                .values(StaffRow::from(&staff_member))
                .returning(StaffRow::as_returning())
                .get_result(conn)
                .map_err(|e| match RepositoryError::from(e) {
                    RepositoryError::ConflictError { .. } => RepositoryError::conflict(format!(
                        "A staff member with email {} already exists",
                        staff_member.email
                    )),
                    other => other,
                })?;
            Staff::try_from(row)
        })
        .await
    }

    async fn get_staff(&self, tenant: TenantId, id: StaffId) -> RepositoryResult<Staff> {
        self.with_conn(move |conn| {
            let row = found(
                staff::table
                    .filter(staff::id.eq(id.value()))
                    .filter(staff::tenant_id.eq(tenant.value()))
                    .select(StaffRow::as_select())
                    .first(conn),
                "staff",
                id,
            )?;
            Staff::try_from(row)
        })
        .await
    }

    async fn find_staff_by_email(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Option<Staff>> {
        let email = email.trim().to_lowercase();
        self.with_conn(move |conn| {
            let row = staff::table
                .filter(staff::tenant_id.eq(tenant.value()))
                .filter(staff::email.eq(&email))
                .select(StaffRow::as_select())
                .first(conn)
                .optional()?;
            row.map(Staff::try_from).transpose()
        })
        .await
    }

    async fn list_staff(&self, tenant: TenantId) -> RepositoryResult<Vec<Staff>> {
        self.with_conn(move |conn| {
            let rows = staff::table
                .filter(staff::tenant_id.eq(tenant.value()))
                .order((staff::last_name.asc(), staff::first_name.asc()))
                .select(StaffRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn update_staff(&self, staff_member: Staff) -> RepositoryResult<Staff> {
        self.with_conn(move |conn| {
            let row = found(
                diesel::update(
                    staff::table
                        .filter(staff::id.eq(staff_member.id.value()))
                        .filter(staff::tenant_id.eq(staff_member.tenant_id.value())),
                )
                .set(StaffRow::from(&staff_member))
                .returning(StaffRow::as_returning())
                .get_result(conn),
                "staff",
                staff_member.id,
            )?;
            Staff::try_from(row)
        })
        .await
    }

    async fn delete_staff(&self, tenant: TenantId, id: StaffId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let n = diesel::delete(
                staff::table
                    .filter(staff::id.eq(id.value()))
                    .filter(staff::tenant_id.eq(tenant.value())),
            )
            .execute(conn)?;
            affected(n, "staff", id)
        })
        .await
    }

    async fn count_staff(&self, tenant: TenantId) -> RepositoryResult<u64> {
        self.with_conn(move |conn| {
            let n: i64 = staff::table
                .filter(staff::tenant_id.eq(tenant.value()))
                .select(count_star())
                .first(conn)?;
            Ok(n as u64)
        })
        .await
    }

    async fn create_schedule(&self, schedule: StaffSchedule) -> RepositoryResult<StaffSchedule> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                found(
                    staff::table
                        .filter(staff::id.eq(schedule.staff_id.value()))
                        .filter(staff::tenant_id.eq(schedule.tenant_id.value()))
                        .select(staff::id)
                        .for_update()
                        .first::<Uuid>(tx),
                    "staff",
                    schedule.staff_id,
                )?;
                if schedule_overlaps(tx, &schedule)? {
                    return Err(RepositoryError::conflict(
                        "Shift overlaps an existing shift for this staff member",
                    ));
                }
                let row = diesel::insert_into(staff_schedules::table)
                    .values(ScheduleRow::from(&schedule))
                    .returning(ScheduleRow::as_returning())
                    .get_result(tx)?;
                Ok(StaffSchedule::from(row))
            })
        })
        .await
    }

    async fn list_schedules(
        &self,
        tenant: TenantId,
        filter: &ScheduleFilter,
    ) -> RepositoryResult<Vec<StaffSchedule>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = staff_schedules::table
                .filter(staff_schedules::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(staff_id) = filter.staff_id {
                query = query.filter(staff_schedules::staff_id.eq(staff_id.value()));
            }
            if let Some(window) = filter.window {
                query = query.filter(
                    staff_schedules::start_time
                        .lt(window.end)
                        .and(staff_schedules::end_time.gt(window.start)),
                );
            }
            let rows = query
                .order(staff_schedules::start_time.asc())
                .select(ScheduleRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(StaffSchedule::from).collect())
        })
        .await
    }

    async fn delete_schedule(&self, tenant: TenantId, id: ScheduleId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let n = diesel::delete(
                staff_schedules::table
                    .filter(staff_schedules::id.eq(id.value()))
                    .filter(staff_schedules::tenant_id.eq(tenant.value())),
            )
            .execute(conn)?;
            affected(n, "schedule", id)
        })
        .await
    }
}

// ==================== Resources & catalog ====================

#[async_trait]
impl ResourceRepository for PostgresRepository {
    async fn create_resource(&self, resource: Resource) -> RepositoryResult<Resource> {
        self.with_conn(move |conn| {
            let row = diesel::insert_into(resources::table)
                .values(ResourceRow::from(&resource))
                .returning(ResourceRow::as_returning())
                .get_result(conn)?;
            Resource::try_from(row)
        })
        .await
    }

    async fn get_resource(&self, tenant: TenantId, id: ResourceId) -> RepositoryResult<Resource> {
        self.with_conn(move |conn| {
            let row = found(
                resources::table
                    .filter(resources::id.eq(id.value()))
                    .filter(resources::tenant_id.eq(tenant.value()))
                    .select(ResourceRow::as_select())
                    .first(conn),
                "resource",
                id,
            )?;
            Resource::try_from(row)
        })
        .await
    }

    async fn list_resources(
        &self,
        tenant: TenantId,
        filter: &ResourceFilter,
    ) -> RepositoryResult<Vec<Resource>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = resources::table
                .filter(resources::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(kind) = filter.resource_type {
                query = query.filter(resources::resource_type.eq(kind.as_str()));
            }
            if let Some(active) = filter.is_active {
                query = query.filter(resources::is_active.eq(active));
            }
            if let Some(needle) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
                query = query.filter(resources::name.ilike(like_pattern(needle.trim())));
            }
            let rows = query
                .order((resources::suite_number.asc().nulls_last(), resources::name.asc()))
                .select(ResourceRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn update_resource(&self, resource: Resource) -> RepositoryResult<Resource> {
        self.with_conn(move |conn| {
            let row = found(
                diesel::update(
                    resources::table
                        .filter(resources::id.eq(resource.id.value()))
                        .filter(resources::tenant_id.eq(resource.tenant_id.value())),
                )
                .set(ResourceRow::from(&resource))
                .returning(ResourceRow::as_returning())
                .get_result(conn),
                "resource",
                resource.id,
            )?;
            Resource::try_from(row)
        })
        .await
    }

    async fn delete_resource(&self, tenant: TenantId, id: ResourceId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                found(
                    resources::table
                        .filter(resources::id.eq(id.value()))
                        .filter(resources::tenant_id.eq(tenant.value()))
                        .select(resources::id)
                        .for_update()
                        .first::<Uuid>(tx),
                    "resource",
                    id,
                )?;
                let busy: bool = diesel::select(exists(
                    reservations::table
                        .filter(reservations::resource_id.eq(id.value()))
                        .filter(reservations::status.eq_any(active_statuses())),
                ))
                .get_result(tx)?;
                if busy {
                    return Err(RepositoryError::conflict(
                        "Resource has active reservations and cannot be deleted",
                    ));
                }
                diesel::update(
                    reservations::table.filter(reservations::resource_id.eq(id.value())),
                )
                .set(reservations::resource_id.eq(None::<Uuid>))
                .execute(tx)?;
                diesel::delete(resources::table.filter(resources::id.eq(id.value())))
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn count_resources(&self, tenant: TenantId) -> RepositoryResult<u64> {
        self.with_conn(move |conn| {
            let n: i64 = resources::table
                .filter(resources::tenant_id.eq(tenant.value()))
                .select(count_star())
                .first(conn)?;
            Ok(n as u64)
        })
        .await
    }

    async fn create_service(&self, service: Service) -> RepositoryResult<Service> {
        self.with_conn(move |conn| {
            let row = diesel::insert_into(services::table)
                .values(ServiceRow::from(&service))
                .returning(ServiceRow::as_returning())
                .get_result(conn)?;
            Service::try_from(row)
        })
        .await
    }

    async fn get_service(&self, tenant: TenantId, id: ServiceId) -> RepositoryResult<Service> {
        self.with_conn(move |conn| {
            let row = found(
                services::table
                    .filter(services::id.eq(id.value()))
                    .filter(services::tenant_id.eq(tenant.value()))
                    .select(ServiceRow::as_select())
                    .first(conn),
                "service",
                id,
            )?;
            Service::try_from(row)
        })
        .await
    }

    async fn list_services(
        &self,
        tenant: TenantId,
        filter: &ServiceFilter,
    ) -> RepositoryResult<Vec<Service>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = services::table
                .filter(services::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(category) = filter.category {
                query = query.filter(services::service_category.eq(category.as_str()));
            }
            if let Some(active) = filter.is_active {
                query = query.filter(services::is_active.eq(active));
            }
            let rows = query
                .order(services::name.asc())
                .select(ServiceRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn update_service(&self, service: Service) -> RepositoryResult<Service> {
        self.with_conn(move |conn| {
            let row = found(
                diesel::update(
                    services::table
                        .filter(services::id.eq(service.id.value()))
                        .filter(services::tenant_id.eq(service.tenant_id.value())),
                )
                .set(ServiceRow::from(&service))
                .returning(ServiceRow::as_returning())
                .get_result(conn),
                "service",
                service.id,
            )?;
            Service::try_from(row)
        })
        .await
    }

    async fn delete_service(&self, tenant: TenantId, id: ServiceId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let referenced: bool = diesel::select(exists(
                    reservations::table.filter(reservations::service_id.eq(id.value())),
                ))
                .get_result(tx)?;
                if referenced {
                    return Err(RepositoryError::conflict(
                        "Service is used by reservations and cannot be deleted",
                    ));
                }
                let n = diesel::delete(
                    services::table
                        .filter(services::id.eq(id.value()))
                        .filter(services::tenant_id.eq(tenant.value())),
                )
                .execute(tx)?;
                affected(n, "service", id)
            })
        })
        .await
    }

    async fn create_add_on(&self, add_on: AddOnService) -> RepositoryResult<AddOnService> {
        self.with_conn(move |conn| {
            let row = diesel::insert_into(add_on_services::table)
                .values(AddOnRow::from(&add_on))
                .returning(AddOnRow::as_returning())
                .get_result(conn)?;
            Ok(AddOnService::from(row))
        })
        .await
    }

    async fn get_add_on(&self, tenant: TenantId, id: AddOnId) -> RepositoryResult<AddOnService> {
        self.with_conn(move |conn| {
            let row = found(
                add_on_services::table
                    .filter(add_on_services::id.eq(id.value()))
                    .filter(add_on_services::tenant_id.eq(tenant.value()))
                    .select(AddOnRow::as_select())
                    .first(conn),
                "add-on",
                id,
            )?;
            Ok(AddOnService::from(row))
        })
        .await
    }

    async fn list_add_ons(
        &self,
        tenant: TenantId,
        filter: &AddOnFilter,
    ) -> RepositoryResult<Vec<AddOnService>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = add_on_services::table
                .filter(add_on_services::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(service) = filter.service_id {
                query = query.filter(
                    add_on_services::service_id
                        .is_null()
                        .or(add_on_services::service_id.eq(service.value())),
                );
            }
            if let Some(active) = filter.is_active {
                query = query.filter(add_on_services::is_active.eq(active));
            }
            let rows = query
                .order(add_on_services::name.asc())
                .select(AddOnRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(AddOnService::from).collect())
        })
        .await
    }

    async fn update_add_on(&self, add_on: AddOnService) -> RepositoryResult<AddOnService> {
        self.with_conn(move |conn| {
            let row = found(
                diesel::update(
                    add_on_services::table
                        .filter(add_on_services::id.eq(add_on.id.value()))
                        .filter(add_on_services::tenant_id.eq(add_on.tenant_id.value())),
                )
                .set(AddOnRow::from(&add_on))
                .returning(AddOnRow::as_returning())
                .get_result(conn),
                "add-on",
                add_on.id,
            )?;
            Ok(AddOnService::from(row))
        })
        .await
    }

    async fn delete_add_on(&self, tenant: TenantId, id: AddOnId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let attached: bool = diesel::select(exists(
                    reservation_add_ons::table
                        .filter(reservation_add_ons::add_on_id.eq(id.value())),
                ))
                .get_result(tx)?;
                if attached {
                    return Err(RepositoryError::conflict(
                        "Add-on is attached to reservations and cannot be deleted",
                    ));
                }
                let n = diesel::delete(
                    add_on_services::table
                        .filter(add_on_services::id.eq(id.value()))
                        .filter(add_on_services::tenant_id.eq(tenant.value())),
                )
                .execute(tx)?;
                affected(n, "add-on", id)
            })
        })
        .await
    }
}

// ==================== Reservations ====================

#[async_trait]
impl ReservationRepository for PostgresRepository {
    async fn find_overlapping_reservations(
        &self,
        tenant: TenantId,
        resource: ResourceId,
        window: TimeWindow,
        exclude: Option<ReservationId>,
    ) -> RepositoryResult<Vec<Reservation>> {
        self.with_conn(move |conn| {
            overlapping(
                conn,
                tenant.value(),
                resource.value(),
                window,
                exclude.map(|id| id.value()),
            )
        })
        .await
    }

    async fn create_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                check_occupancy(tx, &reservation)
                    .map_err(|e| e.with_operation("create_reservation"))?;
                let row = diesel::insert_into(reservations::table)
                    .values(ReservationRow::from(&reservation))
                    .returning(ReservationRow::as_returning())
                    .get_result(tx)?;
                Reservation::try_from(row)
            })
        })
        .await
    }

    async fn get_reservation(
        &self,
        tenant: TenantId,
        id: ReservationId,
    ) -> RepositoryResult<Reservation> {
        self.with_conn(move |conn| {
            let row = found(
                reservations::table
                    .filter(reservations::id.eq(id.value()))
                    .filter(reservations::tenant_id.eq(tenant.value()))
                    .select(ReservationRow::as_select())
                    .first(conn),
                "reservation",
                id,
            )?;
            Reservation::try_from(row)
        })
        .await
    }

    async fn find_reservation_by_external_id(
        &self,
        tenant: TenantId,
        external_id: &str,
    ) -> RepositoryResult<Option<Reservation>> {
        let external_id = external_id.to_string();
        self.with_conn(move |conn| {
            let row = reservations::table
                .filter(reservations::tenant_id.eq(tenant.value()))
                .filter(reservations::external_id.eq(&external_id))
                .select(ReservationRow::as_select())
                .first(conn)
                .optional()?;
            row.map(Reservation::try_from).transpose()
        })
        .await
    }

    async fn list_reservations(
        &self,
        tenant: TenantId,
        filter: &ReservationFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Reservation>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = reservation_query(tenant.value(), &filter)
                .select(count_star())
                .first(conn)?;
            let rows = reservation_query(tenant.value(), &filter)
                .order((reservations::start_date.asc(), reservations::created_at.asc()))
                .limit(page.limit as i64)
                .offset(page.offset() as i64)
                .select(ReservationRow::as_select())
                .load(conn)?;
            Ok(Page {
                items: decode_all(rows)?,
                pagination: Pagination::new(page, total as u64),
            })
        })
        .await
    }

    async fn find_reservations(
        &self,
        tenant: TenantId,
        filter: &ReservationFilter,
    ) -> RepositoryResult<Vec<Reservation>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let rows = reservation_query(tenant.value(), &filter)
                .order((reservations::start_date.asc(), reservations::created_at.asc()))
                .select(ReservationRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn update_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                reservation_exists(tx, reservation.tenant_id.value(), reservation.id.value())?;
                check_occupancy(tx, &reservation)
                    .map_err(|e| e.with_operation("update_reservation"))?;
                let row = diesel::update(reservations::table.find(reservation.id.value()))
                    .set(ReservationRow::from(&reservation))
                    .returning(ReservationRow::as_returning())
                    .get_result(tx)?;
                Reservation::try_from(row)
            })
        })
        .await
    }

    async fn delete_reservation(
        &self,
        tenant: TenantId,
        id: ReservationId,
    ) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let n = diesel::delete(
                reservations::table
                    .filter(reservations::id.eq(id.value()))
                    .filter(reservations::tenant_id.eq(tenant.value())),
            )
            .execute(conn)?;
            affected(n, "reservation", id)
        })
        .await
    }

    async fn add_reservation_add_on(
        &self,
        add_on: ReservationAddOn,
    ) -> RepositoryResult<ReservationAddOn> {
        self.with_conn(move |conn| {
            let tenant = add_on.tenant_id.value();
            reservation_exists(conn, tenant, add_on.reservation_id.value())?;
            let known: bool = diesel::select(exists(
                add_on_services::table
                    .filter(add_on_services::id.eq(add_on.add_on_id.value()))
                    .filter(add_on_services::tenant_id.eq(tenant)),
            ))
            .get_result(conn)?;
            if !known {
                return Err(RepositoryError::entity_not_found("add-on", add_on.add_on_id));
            }
            let row = diesel::insert_into(reservation_add_ons::table)
                .values(ReservationAddOnRow::from(&add_on))
                .returning(ReservationAddOnRow::as_returning())
                .get_result(conn)?;
            Ok(ReservationAddOn::from(row))
        })
        .await
    }

    async fn list_reservation_add_ons(
        &self,
        tenant: TenantId,
        reservation: ReservationId,
    ) -> RepositoryResult<Vec<ReservationAddOn>> {
        self.with_conn(move |conn| {
            reservation_exists(conn, tenant.value(), reservation.value())?;
            let rows = reservation_add_ons::table
                .filter(reservation_add_ons::reservation_id.eq(reservation.value()))
                .order(reservation_add_ons::created_at.asc())
                .select(ReservationAddOnRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(ReservationAddOn::from).collect())
        })
        .await
    }
}

// ==================== Billing ====================

#[async_trait]
impl BillingRepository for PostgresRepository {
    async fn create_invoice(&self, invoice: Invoice) -> RepositoryResult<Invoice> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| insert_invoice(tx, invoice.clone()))
        })
        .await
    }

    async fn get_invoice(&self, tenant: TenantId, id: InvoiceId) -> RepositoryResult<Invoice> {
        self.with_conn(move |conn| load_invoice(conn, tenant.value(), id.value()))
            .await
    }

    async fn list_invoices(
        &self,
        tenant: TenantId,
        filter: &InvoiceFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<Invoice>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = invoice_query(tenant.value(), &filter)
                .select(count_star())
                .first(conn)?;
            let rows = invoice_query(tenant.value(), &filter)
                .order((invoices::issue_date.desc(), invoices::invoice_number.desc()))
                .limit(page.limit as i64)
                .offset(page.offset() as i64)
                .select(InvoiceRow::as_select())
                .load(conn)?;
            Ok(Page {
                items: attach_line_items(conn, rows)?,
                pagination: Pagination::new(page, total as u64),
            })
        })
        .await
    }

    async fn find_invoices(
        &self,
        tenant: TenantId,
        filter: &InvoiceFilter,
    ) -> RepositoryResult<Vec<Invoice>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let rows = invoice_query(tenant.value(), &filter)
                .order((invoices::issue_date.desc(), invoices::invoice_number.desc()))
                .select(InvoiceRow::as_select())
                .load(conn)?;
            attach_line_items(conn, rows)
        })
        .await
    }

    async fn record_payment(&self, payment: Payment) -> RepositoryResult<PaymentReceipt> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| settle(tx, payment.clone()))
        })
        .await
    }

    async fn list_payments(
        &self,
        tenant: TenantId,
        filter: &PaymentFilter,
    ) -> RepositoryResult<Vec<Payment>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = payments::table
                .filter(payments::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(invoice) = filter.invoice_id {
                query = query.filter(payments::invoice_id.eq(invoice.value()));
            }
            if let Some(customer) = filter.customer_id {
                query = query.filter(payments::customer_id.eq(customer.value()));
            }
            if let Some(method) = filter.method {
                query = query.filter(payments::method.eq(method.as_str()));
            }
            if let Some(window) = filter.paid {
                query = query.filter(
                    payments::paid_at
                        .ge(window.start)
                        .and(payments::paid_at.lt(window.end)),
                );
            }
            let rows = query
                .order(payments::paid_at.desc())
                .select(PaymentRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn checkout(&self, plan: CheckoutPlan) -> RepositoryResult<CheckoutResult> {
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let plan = plan.clone();
                let tenant = plan.invoice.tenant_id.value();

                if let Some(key) = &plan.idempotency {
                    // Same-key requests queue here, so the later one replays
                    // the earlier result instead of hitting the primary key.
                    let lock_name = format!("checkout:{}:{}", tenant, key.key);
                    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                        .bind::<diesel::sql_types::Text, _>(lock_name)
                        .execute(tx)?;
                    if let Some(stored) = stored_checkout(tx, tenant, key)? {
                        return Ok(stored);
                    }
                }

                let mut trial = plan.invoice.clone();
                trial
                    .apply_payment(plan.payment.amount)
                    .map_err(RepositoryError::validation)?;

                let invoice = insert_invoice(tx, plan.invoice)?;
                let receipt = settle(
                    tx,
                    Payment {
                        invoice_id: invoice.id,
                        ..plan.payment
                    },
                )?;

                let result = CheckoutResult {
                    invoice: receipt.invoice,
                    payment: receipt.payment,
                    transaction: receipt.transaction,
                    replayed: false,
                };

                if let Some(key) = plan.idempotency {
                    let response = serde_json::to_value(&result).map_err(|e| {
                        RepositoryError::internal(format!("Cannot store checkout result: {}", e))
                    })?;
                    diesel::insert_into(checkout_idempotency_keys::table)
                        .values(IdempotencyRow {
                            tenant_id: tenant,
                            idempotency_key: key.key,
                            fingerprint: key.fingerprint,
                            invoice_id: result.invoice.id.value(),
                            payment_id: result.payment.id.value(),
                            transaction_id: result.transaction.id.value(),
                            response,
                            created_at: Utc::now(),
                        })
                        .execute(tx)?;
                }

                Ok(result)
            })
        })
        .await
    }

    async fn find_checkout(
        &self,
        tenant: TenantId,
        key: &IdempotencyKey,
    ) -> RepositoryResult<Option<CheckoutResult>> {
        let key = key.clone();
        self.with_conn(move |conn| stored_checkout(conn, tenant.value(), &key))
            .await
    }

    async fn list_financial_transactions(
        &self,
        tenant: TenantId,
        invoice: Option<InvoiceId>,
    ) -> RepositoryResult<Vec<FinancialTransaction>> {
        self.with_conn(move |conn| {
            let mut query = financial_transactions::table
                .filter(financial_transactions::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(invoice) = invoice {
                query = query.filter(financial_transactions::invoice_id.eq(invoice.value()));
            }
            let rows = query
                .order(financial_transactions::created_at.asc())
                .select(TransactionRow::as_select())
                .load(conn)?;
            decode_all(rows)
        })
        .await
    }
}

/// The snapshot stored by an earlier checkout under `key`, if any.
fn stored_checkout(
    conn: &mut PgConnection,
    tenant: Uuid,
    key: &IdempotencyKey,
) -> RepositoryResult<Option<CheckoutResult>> {
    let stored = checkout_idempotency_keys::table
        .filter(checkout_idempotency_keys::tenant_id.eq(tenant))
        .filter(checkout_idempotency_keys::idempotency_key.eq(&key.key))
        .select(IdempotencyRow::as_select())
        .first(conn)
        .optional()?;
    let Some(stored) = stored else {
        return Ok(None);
    };
    if stored.fingerprint != key.fingerprint {
        return Err(RepositoryError::conflict(
            "Idempotency key was already used with a different request",
        ));
    }
    let result: CheckoutResult = serde_json::from_value(stored.response).map_err(|e| {
        RepositoryError::internal(format!("Stored checkout result is unreadable: {}", e))
    })?;
    Ok(Some(CheckoutResult {
        replayed: true,
        ..result
    }))
}

// ==================== Usage ====================

#[async_trait]
impl UsageRepository for PostgresRepository {
    async fn record_usage(&self, usage: TenantUsage) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            diesel::insert_into(tenant_usage::table)
                .values(UsageRow::from(&usage))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn list_usage(
        &self,
        tenant: TenantId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> RepositoryResult<Vec<TenantUsage>> {
        self.with_conn(move |conn| {
            let mut query = tenant_usage::table
                .filter(tenant_usage::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(since) = since {
                query = query.filter(tenant_usage::recorded_at.ge(since));
            }
            let rows = query
                .order(tenant_usage::recorded_at.desc())
                .limit(limit as i64)
                .select(UsageRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(TenantUsage::from).collect())
        })
        .await
    }

    async fn usage_summary(
        &self,
        tenant: TenantId,
        since: Option<DateTime<Utc>>,
    ) -> RepositoryResult<UsageSummary> {
        self.with_conn(move |conn| {
            let mut query = tenant_usage::table
                .filter(tenant_usage::tenant_id.eq(tenant.value()))
                .into_boxed();
            if let Some(since) = since {
                query = query.filter(tenant_usage::recorded_at.ge(since));
            }
            let rows = query.select(UsageRow::as_select()).load(conn)?;
            let records: Vec<TenantUsage> = rows.into_iter().map(TenantUsage::from).collect();
            Ok(UsageSummary::from_records(tenant, since, &records))
        })
        .await
    }
}
