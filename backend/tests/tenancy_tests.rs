//! Tenant resolution, isolation, quotas, rate limits, usage metering and the
//! production error envelope.

#![cfg(feature = "http-server")]

mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::http::{id_of, seed_booking_data, test_config, TestApp};
use tailtown::config::Environment;
use tailtown::db::repository::TenantRepository;

async fn create_tenant(app: &TestApp, body: serde_json::Value) -> String {
    let reply = app.customers().without_tenant().post("/api/v1/tenants", body).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    id_of(reply.data())
}

#[tokio::test]
async fn test_tenant_header_is_required_and_resolved() {
    let app = TestApp::new();
    let api = app.customers();

    let missing = api.clone().without_tenant().get("/api/v1/customers").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.error_type(), "VALIDATION_ERROR");

    let unknown = api.clone().tenant("nobody").get("/api/v1/customers").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let dev = app.repo.get_tenant_by_slug("dev").await.unwrap();
    let by_id = api.clone().tenant(dev.id.to_string()).get("/api/v1/customers").await;
    assert_eq!(by_id.status, StatusCode::OK);

    let by_slug = api.tenant("DEV").get("/api/customers").await;
    assert_eq!(by_slug.status, StatusCode::OK);
}

#[tokio::test]
async fn test_tenants_cannot_see_each_other() {
    let app = TestApp::new();
    create_tenant(
        &app,
        json!({"name": "Happy Paws", "slug": "happy-paws", "subscriptionTier": "PROFESSIONAL"}),
    )
    .await;

    let dev = app.customers();
    let other = app.customers().tenant("happy-paws");

    let created = dev
        .post("/api/v1/customers", json!({"firstName": "Ada", "lastName": "L"}))
        .await;
    let id = id_of(created.data());

    let listed = other.get("/api/v1/customers").await;
    assert_eq!(listed.data()["customers"], json!([]));

    let fetched = other.get(&format!("/api/v1/customers/{}", id)).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);

    let updated = other
        .put(&format!("/api/v1/customers/{}", id), json!({"firstName": "Eve"}))
        .await;
    assert_eq!(updated.status, StatusCode::NOT_FOUND);

    let deleted = other
        .delete(&format!("/api/v1/customers/{}?permanent=true", id))
        .await;
    assert_eq!(deleted.status, StatusCode::NOT_FOUND);

    let mine = dev.get(&format!("/api/v1/customers/{}", id)).await;
    assert_eq!(mine.data()["firstName"], "Ada");
}

#[tokio::test]
async fn test_booking_and_billing_rows_stay_in_their_tenant() {
    let app = TestApp::new();
    create_tenant(
        &app,
        json!({"name": "Happy Paws", "slug": "happy-paws", "subscriptionTier": "PROFESSIONAL"}),
    )
    .await;
    let seed = seed_booking_data(&app).await;
    let dev = app.reservations();
    let other = app.reservations().tenant("happy-paws");

    let stay = dev
        .post("/api/v1/reservations", seed.reservation("2024-09-01", "2024-09-03"))
        .await;
    assert_eq!(stay.status, StatusCode::CREATED, "{}", stay.body);
    let stay_id = id_of(stay.data());
    let add_on = dev
        .post("/api/v1/add-ons", json!({"name": "Playtime", "price": 10.0}))
        .await;
    let add_on_id = id_of(add_on.data());
    let sale = dev
        .post(
            "/api/v1/checkout",
            json!({
                "customerId": seed.customer_id,
                "reservationId": stay_id,
                "payment": {"method": "CASH"},
            }),
        )
        .await;
    assert_eq!(sale.status, StatusCode::CREATED, "{}", sale.body);
    let invoice_id = id_of(&sale.data()["invoice"]);

    // Lists come back empty for the other tenant.
    for (uri, key) in [
        ("/api/v1/reservations", "reservations"),
        ("/api/v1/resources", "resources"),
        ("/api/v1/services", "services"),
        ("/api/v1/add-ons", "addOns"),
        ("/api/v1/invoices", "invoices"),
        ("/api/v1/payments", "payments"),
        ("/api/v1/transactions", "transactions"),
        ("/api/v1/resources/available?date=2024-09-10", "resources"),
    ] {
        let reply = other.get(uri).await;
        assert_eq!(reply.status, StatusCode::OK, "{} {}", uri, reply.body);
        assert_eq!(reply.data()[key], json!([]), "{}", uri);
        assert_eq!(dev.get(uri).await.data()[key].as_array().unwrap().len(), 1, "{}", uri);
    }

    // Single rows are reported missing, never forbidden.
    for uri in [
        format!("/api/v1/reservations/{}", stay_id),
        format!("/api/v1/reservations/{}/add-ons", stay_id),
        format!("/api/v1/resources/{}", seed.resource_id),
        format!("/api/v1/services/{}", seed.service_id),
        format!("/api/v1/add-ons/{}", add_on_id),
        format!("/api/v1/invoices/{}", invoice_id),
        format!("/api/v1/invoices/{}/payments", invoice_id),
        format!(
            "/api/v1/resources/availability?resourceId={}&startDate=2024-09-01&endDate=2024-09-02",
            seed.resource_id
        ),
    ] {
        let reply = other.get(&uri).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{} {}", uri, reply.body);
    }

    // Writes against foreign ids are refused the same way.
    let booked_elsewhere = other
        .post("/api/v1/reservations", seed.reservation("2024-09-05", "2024-09-06"))
        .await;
    assert_eq!(booked_elsewhere.status, StatusCode::NOT_FOUND);
    let paid_elsewhere = other
        .post(
            &format!("/api/v1/invoices/{}/payments", invoice_id),
            json!({"amount": 1.0, "method": "CASH"}),
        )
        .await;
    assert_eq!(paid_elsewhere.status, StatusCode::NOT_FOUND);
    let dropped_elsewhere = other
        .delete(&format!("/api/v1/reservations/{}", stay_id))
        .await;
    assert_eq!(dropped_elsewhere.status, StatusCode::NOT_FOUND);
    assert_eq!(
        dev.get(&format!("/api/v1/reservations/{}", stay_id)).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_inactive_tenant_is_forbidden() {
    let app = TestApp::new();
    let id = create_tenant(&app, json!({"name": "Closed", "slug": "closed"})).await;

    let admin = app.customers().without_tenant();
    let deactivated = admin
        .put(&format!("/api/v1/tenants/{}", id), json!({"isActive": false}))
        .await;
    assert_eq!(deactivated.status, StatusCode::OK);

    let reply = app.customers().tenant("closed").get("/api/v1/customers").await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.error_type(), "AUTHORIZATION_ERROR");
}

#[tokio::test]
async fn test_quota_and_feature_limits() {
    let app = TestApp::new();
    create_tenant(
        &app,
        json!({"name": "Tiny", "slug": "tiny", "maxCustomers": 1, "maxResources": 1}),
    )
    .await;
    let customers = app.customers().tenant("tiny");
    let reservations = app.reservations().tenant("tiny");

    let first = customers
        .post("/api/v1/customers", json!({"firstName": "A", "lastName": "One"}))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    let second = customers
        .post("/api/v1/customers", json!({"firstName": "B", "lastName": "Two"}))
        .await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);
    assert_eq!(second.error_type(), "AUTHORIZATION_ERROR");

    let kennel = reservations
        .post("/api/v1/resources", json!({"name": "K1"}))
        .await;
    assert_eq!(kennel.status, StatusCode::CREATED);
    let over = reservations
        .post("/api/v1/resources", json!({"name": "K2"}))
        .await;
    assert_eq!(over.status, StatusCode::FORBIDDEN);

    // Starter tier has no reports or point of sale.
    let report = reservations.get("/api/v1/reports/dashboard").await;
    assert_eq!(report.status, StatusCode::FORBIDDEN);
    let checkout = reservations
        .post(
            "/api/v1/checkout",
            json!({
                "customerId": id_of(first.data()),
                "items": [{"type": "PRODUCT", "description": "Treats", "unitPrice": 5.0}],
                "payment": {"method": "CASH"},
            }),
        )
        .await;
    assert_eq!(checkout.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rate_limit_per_tenant() {
    let app = TestApp::new();
    create_tenant(
        &app,
        json!({"name": "Busy", "slug": "busy", "rateLimitPerMinute": 2}),
    )
    .await;
    let busy = app.customers().tenant("busy");

    assert_eq!(busy.get("/api/v1/customers").await.status, StatusCode::OK);
    assert_eq!(busy.get("/api/v1/customers").await.status, StatusCode::OK);
    let limited = busy.get("/api/v1/customers").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.error_type(), "RATE_LIMIT_EXCEEDED");
    assert!(limited.headers.contains_key("retry-after"));

    // Other tenants keep their own budget.
    assert_eq!(
        app.customers().get("/api/v1/customers").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_usage_is_metered_per_tenant() {
    let app = TestApp::new();
    let api = app.customers();
    api.get("/api/v1/customers").await;
    api.get("/api/v1/customers").await;
    api.get(&format!("/api/v1/customers/{}", uuid::Uuid::new_v4()))
        .await;

    let dev = app.repo.get_tenant_by_slug("dev").await.unwrap();
    let usage = api
        .clone()
        .without_tenant()
        .get(&format!("/api/v1/tenants/{}/usage", dev.id))
        .await;
    assert_eq!(usage.status, StatusCode::OK, "{}", usage.body);
    assert_eq!(usage.data()["totalRequests"], 3);
    assert_eq!(usage.data()["errorCount"], 1);
    let endpoints = usage.data()["byEndpoint"].as_array().unwrap();
    assert_eq!(endpoints[0]["count"], 2);
    assert!(endpoints[0]["endpoint"].as_str().unwrap().ends_with("/customers"));

    let records = api
        .without_tenant()
        .get(&format!("/api/v1/tenants/{}/usage/records?limit=2", dev.id))
        .await;
    assert_eq!(records.data()["usage"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_production_envelope_hides_internals() {
    let mut config = test_config();
    config.environment = Environment::Production;
    let app = TestApp::with_config(config);

    let not_found = app
        .reservations()
        .get(&format!("/api/v1/services/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(not_found.status, StatusCode::NOT_FOUND);
    assert!(not_found.body["error"].get("details").is_none());
    assert!(not_found.body["error"]["message"].is_string());

    app.repo.set_healthy(false);
    let broken = app.reservations().get("/api/v1/services").await;
    assert_eq!(broken.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        broken.body,
        json!({
            "status": "error",
            "error": {"type": "DATABASE_ERROR", "message": "Internal server error"}
        })
    );

    let health = app.reservations().get("/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["database"], "disconnected");
    assert_eq!(health.body["service"], "reservation-service");
}

#[tokio::test]
async fn test_development_envelope_keeps_details() {
    let app = TestApp::new();
    app.repo.set_healthy(false);
    let broken = app.customers().get("/api/v1/customers").await;
    assert_eq!(broken.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(broken.body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not healthy"));
}
