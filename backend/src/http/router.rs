//! Routers for the two services.
//!
//! Both share the middleware stack and mount their API under `/api/v1` and
//! `/api`. Tenant-scoped routes get authentication, tenant resolution and
//! usage metering as route layers, so unknown paths fall through to the 404
//! envelope without needing a tenant.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    self, auth, billing, catalog, customers, jobs, reports, reservations, staff, tenants,
};
use super::middleware;
use super::state::AppState;

/// Import payloads can carry thousands of reservations.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Customers, pets, staff, schedules, staff auth and tenant administration.
pub fn customer_router(state: AppState) -> Router {
    let scoped = Router::new()
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/customers/{id}/pets", get(customers::list_customer_pets))
        .route("/pets", get(customers::list_pets).post(customers::create_pet))
        .route(
            "/pets/{id}",
            get(customers::get_pet)
                .put(customers::update_pet)
                .delete(customers::delete_pet),
        )
        .route("/staff", get(staff::list_staff).post(staff::create_staff))
        .route(
            "/staff/{id}",
            get(staff::get_staff)
                .put(staff::update_staff)
                .delete(staff::delete_staff),
        )
        .route("/staff/{id}/schedules", get(staff::list_staff_schedules))
        .route(
            "/schedules",
            get(staff::list_schedules).post(staff::create_schedule),
        )
        .route("/schedules/{id}", axum::routing::delete(staff::delete_schedule));

    let auth_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route_layer(from_fn_with_state(state.clone(), middleware::resolve_tenant));

    let admin = Router::new()
        .route(
            "/tenants",
            get(tenants::list_tenants).post(tenants::create_tenant),
        )
        .route(
            "/tenants/{id}",
            get(tenants::get_tenant).put(tenants::update_tenant),
        )
        .route("/tenants/{id}/usage", get(tenants::usage_summary))
        .route("/tenants/{id}/usage/records", get(tenants::usage_records))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin))
        .route_layer(from_fn_with_state(state.clone(), middleware::authenticate));

    let api = tenant_scoped(scoped, &state).merge(auth_routes).merge(admin);
    assemble(api, state)
}

/// Resources, availability, catalog, reservations, imports, billing and reports.
pub fn reservation_router(state: AppState) -> Router {
    let scoped = Router::new()
        .route(
            "/resources",
            get(catalog::list_resources).post(catalog::create_resource),
        )
        .route("/resources/availability", get(catalog::check_availability))
        .route(
            "/resources/availability/batch",
            post(catalog::check_batch_availability),
        )
        .route("/resources/available", get(catalog::available_resources))
        .route(
            "/resources/{id}",
            get(catalog::get_resource)
                .put(catalog::update_resource)
                .delete(catalog::delete_resource),
        )
        .route(
            "/services",
            get(catalog::list_services).post(catalog::create_service),
        )
        .route(
            "/services/{id}",
            get(catalog::get_service)
                .put(catalog::update_service)
                .delete(catalog::delete_service),
        )
        .route(
            "/add-ons",
            get(catalog::list_add_ons).post(catalog::create_add_on),
        )
        .route(
            "/add-ons/{id}",
            get(catalog::get_add_on)
                .put(catalog::update_add_on)
                .delete(catalog::delete_add_on),
        )
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/reservations/import", post(jobs::import_reservations))
        .route(
            "/reservations/{id}",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route("/reservations/{id}/status", patch(reservations::change_status))
        .route(
            "/reservations/{id}/add-ons",
            get(reservations::list_reservation_add_ons).post(reservations::add_reservation_add_on),
        )
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/logs", get(jobs::stream_job_logs))
        .route(
            "/invoices",
            get(billing::list_invoices).post(billing::create_invoice),
        )
        .route("/invoices/{id}", get(billing::get_invoice))
        .route(
            "/invoices/{id}/payments",
            get(billing::list_invoice_payments).post(billing::record_payment),
        )
        .route("/payments", get(billing::list_payments))
        .route("/transactions", get(billing::list_transactions))
        .route("/checkout", post(billing::checkout))
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/reports/revenue", get(reports::revenue));

    let api = tenant_scoped(scoped, &state);
    assemble(api, state)
}

/// Auth outermost, then tenant resolution, then metering.
fn tenant_scoped(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state(state.clone(), middleware::record_usage))
        .route_layer(from_fn_with_state(state.clone(), middleware::resolve_tenant))
        .route_layer(from_fn_with_state(state.clone(), middleware::authenticate))
}

fn assemble(api: Router<AppState>, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api.clone())
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::error_envelope))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::db::repositories::LocalRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::with_demo_tenant("dev"));
        let _customers = customer_router(AppState::new("customer-service", repo.clone(), ServiceConfig::new(4004)));
        let _reservations = reservation_router(AppState::new("reservation-service", repo, ServiceConfig::new(4003)));
    }
}
