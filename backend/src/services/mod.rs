//! Service layer for business rules.
//!
//! Services sit between the HTTP handlers and the repository traits. They are
//! free functions generic over [`FullRepository`](crate::db::repository::FullRepository),
//! so they run unchanged against the local and Postgres backends, and they
//! return [`AppError`](crate::error::AppError) with the status the API exposes.

pub mod auth;
pub mod availability;
pub mod billing;
pub mod catalog;
pub mod customers;
pub mod import;
pub mod job_tracker;
pub mod reports;
pub mod reservations;
pub mod schema_fallback;
pub mod staff;
pub mod tenants;
pub mod validation;

pub use auth::{Claims, TokenPair, TokenService};
pub use customers::DeleteMode;
pub use job_tracker::JobTracker;
pub use tenants::{ensure_quota, require_feature, resolve_tenant, Quota};
