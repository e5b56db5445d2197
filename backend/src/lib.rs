//! # Tailtown backend
//!
//! Multi-tenant pet resort management: customers and pets, staff and
//! schedules, kennels and suites, reservations, billing and reports.
//!
//! Two HTTP services are built from this crate:
//!
//! - `customer-service` (port 4004): customers, pets, staff, schedules,
//!   staff authentication and tenant administration.
//! - `reservation-service` (port 4003): resources and availability, the
//!   service catalog, reservations, imports, invoices, payments, checkout and
//!   reports.
//!
//! ## Architecture
//!
//! - [`models`]: domain types shared by both services
//! - [`db`]: repository traits with in-memory and PostgreSQL backends
//! - [`services`]: business rules (validation, quotas, pricing, conflicts)
//! - [`http`]: axum routers, middleware and handlers
//! - [`config`] and [`error`]: environment configuration and the error type
//!   every layer returns
//!
//! Every repository call takes the tenant id, so one tenant can never read
//! or modify another tenant's rows.

// RepositoryError carries rich context for logging.
#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
