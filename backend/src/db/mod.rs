//! Persistence layer for tenants, bookings and billing.
//!
//! Storage is reached through the repository traits in [`repository`], so the
//! services and HTTP handlers never know which backend is in use.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers (customer-service, reservation-service)  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service layer (crate::services) - business rules       │
//! │  - validation, quotas, pricing, status transitions      │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/) - FullRepository       │
//! └──────────┬───────────────────────────────┬──────────────┘
//!            │                               │
//! ┌──────────▼──────────┐         ┌──────────▼──────────────┐
//! │  LocalRepository    │         │  PostgresRepository     │
//! │  (in-memory)        │         │  (Diesel + r2d2)        │
//! └─────────────────────┘         └─────────────────────────┘
//! ```
//!
//! # Usage
//! ```ignore
//! use tailtown::db::{self, RepositoryBuilder};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let repo = db::init_repository(RepositoryBuilder::new().from_env()?).await?;
//! let tenants = repo.list_tenants().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod checksum;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use checksum::{calculate_checksum, request_fingerprint};
pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    BillingRepository, CustomerRepository, ErrorContext, FullRepository, RepositoryError,
    RepositoryResult, ReservationRepository, ResourceRepository, StaffRepository,
    TenantRepository, UsageRepository,
};

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};

/// Process-wide repository, set once by the service binaries.
static REPOSITORY: OnceLock<Arc<dyn FullRepository>> = OnceLock::new();

/// Build the repository described by `builder` and install it as the global
/// instance. Later calls return the instance installed first.
pub async fn init_repository(builder: RepositoryBuilder) -> Result<Arc<dyn FullRepository>> {
    if let Some(repo) = REPOSITORY.get() {
        return Ok(Arc::clone(repo));
    }

    let selected = builder.selected_type();
    let repo = builder
        .build()
        .await
        .with_context(|| format!("Failed to initialize {:?} repository", selected))?;

    let installed = REPOSITORY.get_or_init(|| repo);
    Ok(Arc::clone(installed))
}

/// The global repository instance.
pub fn get_repository() -> Result<&'static Arc<dyn FullRepository>> {
    REPOSITORY
        .get()
        .context("Database not initialized. Call init_repository() first.")
}
