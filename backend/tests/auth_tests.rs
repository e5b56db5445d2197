//! Staff login, token refresh and enforcement when `REQUIRE_AUTH` is on.

#![cfg(feature = "http-server")]

mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::http::{test_config, TestApp};
use tailtown::db::repository::TenantRepository;
use tailtown::models::{CreateStaff, StaffRole};
use tailtown::services::staff;

const PASSWORD: &str = "kennel-keeper-42";

async fn secured_app() -> TestApp {
    let mut config = test_config();
    config.require_auth = true;
    let app = TestApp::with_config(config);

    let tenant = app.repo.get_tenant_by_slug("dev").await.unwrap();
    for (email, role) in [
        ("boss@example.com", StaffRole::Admin),
        ("desk@example.com", StaffRole::Staff),
    ] {
        staff::create_staff(
            app.repo.as_ref(),
            &tenant,
            CreateStaff {
                first_name: "Test".into(),
                last_name: "User".into(),
                email: email.into(),
                phone: None,
                role,
                department: None,
                position: None,
                password: Some(PASSWORD.into()),
            },
        )
        .await
        .unwrap();
    }
    app
}

async fn login(app: &TestApp, email: &str) -> serde_json::Value {
    let reply = app
        .customers()
        .post("/api/v1/auth/login", json!({"email": email, "password": PASSWORD}))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply.data().clone()
}

#[tokio::test]
async fn test_requests_need_a_token() {
    let app = secured_app().await;

    let anonymous = app.customers().get("/api/v1/customers").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.error_type(), "AUTHENTICATION_ERROR");

    let garbage = app
        .customers()
        .token("not.a.jwt")
        .get("/api/v1/customers")
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let health = app.customers().without_tenant().get("/health").await;
    assert_eq!(health.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_and_use_access_token() {
    let app = secured_app().await;
    let session = login(&app, "desk@example.com").await;
    assert_eq!(session["tokenType"], "Bearer");
    assert_eq!(session["staff"]["email"], "desk@example.com");

    let token = session["accessToken"].as_str().unwrap();
    let reply = app
        .reservations()
        .token(token)
        .get("/api/v1/resources")
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

    // The claim alone selects the tenant.
    let claim_only = app
        .customers()
        .without_tenant()
        .token(token)
        .get("/api/v1/customers")
        .await;
    assert_eq!(claim_only.status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = secured_app().await;
    let reply = app
        .customers()
        .post(
            "/api/v1/auth/login",
            json!({"email": "desk@example.com", "password": "guess"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .customers()
        .post(
            "/api/v1/auth/login",
            json!({"email": "nobody@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"]["message"], unknown.body["error"]["message"]);
}

#[tokio::test]
async fn test_refresh_token_only_refreshes() {
    let app = secured_app().await;
    let session = login(&app, "desk@example.com").await;
    let refresh = session["refreshToken"].as_str().unwrap();

    let misuse = app
        .customers()
        .token(refresh)
        .get("/api/v1/customers")
        .await;
    assert_eq!(misuse.status, StatusCode::UNAUTHORIZED);

    let renewed = app
        .customers()
        .post("/api/v1/auth/refresh", json!({"refreshToken": refresh}))
        .await;
    assert_eq!(renewed.status, StatusCode::OK, "{}", renewed.body);
    let access = renewed.data()["accessToken"].as_str().unwrap();
    let reply = app.customers().token(access).get("/api/v1/pets").await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_cannot_cross_tenants() {
    let app = secured_app().await;
    let admin = login(&app, "boss@example.com").await;
    let admin_token = admin["accessToken"].as_str().unwrap();

    let created = app
        .customers()
        .without_tenant()
        .token(admin_token)
        .post("/api/v1/tenants", json!({"name": "Elsewhere", "slug": "elsewhere"}))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);

    let crossing = app
        .customers()
        .tenant("elsewhere")
        .token(admin_token)
        .get("/api/v1/customers")
        .await;
    assert_eq!(crossing.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tenant_admin_requires_admin_role() {
    let app = secured_app().await;
    let desk = login(&app, "desk@example.com").await;
    let boss = login(&app, "boss@example.com").await;

    let anonymous = app.customers().without_tenant().get("/api/v1/tenants").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let staff_only = app
        .customers()
        .without_tenant()
        .token(desk["accessToken"].as_str().unwrap())
        .get("/api/v1/tenants")
        .await;
    assert_eq!(staff_only.status, StatusCode::FORBIDDEN);

    let admin = app
        .customers()
        .without_tenant()
        .token(boss["accessToken"].as_str().unwrap())
        .get("/api/v1/tenants")
        .await;
    assert_eq!(admin.status, StatusCode::OK);
    assert_eq!(admin.data()["tenants"].as_array().unwrap().len(), 1);
}
