//! Repository trait definitions for database operations.
//!
//! Responsibilities are split across focused traits so each can be read
//! (and faked) on its own:
//!
//! - [`error`]: Error types for repository operations
//! - [`tenant`]: Tenants and connection health
//! - [`customer`]: Customers and pets
//! - [`staff`]: Staff members and shifts
//! - [`resource`]: Kennels, services and add-ons
//! - [`reservation`]: Reservations, occupancy checks and reservation add-ons
//! - [`billing`]: Invoices, payments, the audit trail and checkout
//! - [`usage`]: Request metering
//!
//! Every tenant-scoped method takes the owning [`TenantId`](crate::models::TenantId)
//! and never returns rows of another tenant.
//!
//! Use [`FullRepository`] as the bound when a function needs everything:
//!
//! ```ignore
//! async fn create<R: FullRepository + ?Sized>(repo: &R, r: Reservation) -> RepositoryResult<()> {
//!     repo.get_customer(r.tenant_id, r.customer_id).await?;
//!     repo.create_reservation(r).await?;
//!     Ok(())
//! }
//! ```

pub mod billing;
pub mod customer;
pub mod error;
pub mod reservation;
pub mod resource;
pub mod staff;
pub mod tenant;
pub mod usage;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use billing::BillingRepository;
pub use customer::CustomerRepository;
pub use reservation::ReservationRepository;
pub use resource::ResourceRepository;
pub use staff::StaffRepository;
pub use tenant::TenantRepository;
pub use usage::UsageRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Implemented automatically for any type implementing every repository trait.
pub trait FullRepository:
    TenantRepository
    + CustomerRepository
    + StaffRepository
    + ResourceRepository
    + ReservationRepository
    + BillingRepository
    + UsageRepository
{
}

impl<T> FullRepository for T where
    T: TenantRepository
        + CustomerRepository
        + StaffRepository
        + ResourceRepository
        + ReservationRepository
        + BillingRepository
        + UsageRepository
{
}
