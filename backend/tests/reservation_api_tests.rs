//! Reservation service end to end: availability, booking conflicts and the
//! reservation lifecycle.

#![cfg(feature = "http-server")]

mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::http::{id_of, seed_booking_data, TestApp};

#[tokio::test]
async fn test_availability_reflects_overlapping_reservations() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    let created = api
        .post("/api/v1/reservations", seed.reservation("2024-05-01", "2024-05-03"))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);

    let busy = api
        .get(&format!(
            "/api/v1/resources/availability?resourceId={}&startDate=2024-05-02&endDate=2024-05-04",
            seed.resource_id
        ))
        .await;
    assert_eq!(busy.status, StatusCode::OK);
    assert_eq!(busy.data()["isAvailable"], false);
    assert_eq!(
        busy.data()["conflictingReservations"][0]["id"],
        created.data()["id"]
    );

    let free = api
        .get(&format!(
            "/api/resources/availability?kennelId={}&date=2024-05-03",
            seed.resource_id
        ))
        .await;
    assert_eq!(free.status, StatusCode::OK);
    assert_eq!(free.data()["isAvailable"], true);
}

#[tokio::test]
async fn test_overlapping_booking_is_rejected_and_not_stored() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    let first = api
        .post("/api/v1/reservations", seed.reservation("2024-05-01", "2024-05-04"))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let clash = api
        .post("/api/v1/reservations", seed.reservation("2024-05-03", "2024-05-06"))
        .await;
    assert_eq!(clash.status, StatusCode::BAD_REQUEST);
    assert_eq!(clash.body["status"], "error");
    assert_eq!(clash.error_type(), "RESOURCE_CONFLICT");
    assert_eq!(
        clash.body["error"]["details"]["conflictingReservations"][0]["id"],
        first.data()["id"]
    );
    assert_eq!(app.repo.reservation_count(), 1);

    // Checkout day is free for the next guest.
    let back_to_back = api
        .post("/api/v1/reservations", seed.reservation("2024-05-04", "2024-05-06"))
        .await;
    assert_eq!(back_to_back.status, StatusCode::CREATED, "{}", back_to_back.body);
}

#[tokio::test]
async fn test_cancelled_reservation_frees_the_resource() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    let first = api
        .post("/api/v1/reservations", seed.reservation("2024-06-10", "2024-06-12"))
        .await;
    let id = id_of(first.data());

    let cancelled = api
        .patch(
            &format!("/api/v1/reservations/{}/status", id),
            json!({"status": "CANCELLED"}),
        )
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.data()["status"], "CANCELLED");

    let rebooked = api
        .post("/api/v1/reservations", seed.reservation("2024-06-10", "2024-06-12"))
        .await;
    assert_eq!(rebooked.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_reservation_details_and_pricing() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    let mut body = seed.reservation("2024-07-01", "2024-07-04");
    body["kennelId"] = body["resourceId"].take();
    body.as_object_mut().unwrap().remove("resourceId");

    let created = api.post("/api/v1/reservations", body).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let data = created.data();
    assert_eq!(data["price"], 135.0);
    assert_eq!(data["status"], "PENDING");
    assert_eq!(data["resourceId"], seed.resource_id.as_str());
    assert_eq!(data["resource"]["id"], seed.resource_id.as_str());
    assert_eq!(data["customer"]["firstName"], "Grace");
    assert_eq!(data["pet"]["name"], "Biscuit");

    let fetched = api
        .get(&format!("/api/v1/reservations/{}", id_of(data)))
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.data()["service"]["name"], "Overnight boarding");
}

#[tokio::test]
async fn test_status_transitions_are_enforced() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    let created = api
        .post("/api/v1/reservations", seed.reservation("2024-08-01", "2024-08-02"))
        .await;
    let uri = format!("/api/v1/reservations/{}/status", id_of(created.data()));

    let skipped = api.patch(&uri, json!({"status": "CHECKED_OUT"})).await;
    assert_eq!(skipped.status, StatusCode::BAD_REQUEST);
    assert_eq!(skipped.body["error"]["details"]["currentStatus"], "PENDING");

    for status in ["CONFIRMED", "CHECKED_IN", "CHECKED_OUT"] {
        let reply = api.patch(&uri, json!({"status": status})).await;
        assert_eq!(reply.status, StatusCode::OK, "{}: {}", status, reply.body);
    }
    let done = api.get(&uri.replace("/status", "")).await;
    assert!(done.data()["checkInAt"].is_string());
    assert!(done.data()["checkOutAt"].is_string());
}

#[tokio::test]
async fn test_list_filters_and_paginates() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    for (start, end) in [
        ("2024-09-01", "2024-09-02"),
        ("2024-09-03", "2024-09-04"),
        ("2024-09-05", "2024-09-06"),
    ] {
        let reply = api.post("/api/v1/reservations", seed.reservation(start, end)).await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let page = api.get("/api/v1/reservations?page=2&limit=2").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.data()["reservations"].as_array().unwrap().len(), 1);
    assert_eq!(page.body["pagination"]["totalCount"], 3);
    assert_eq!(page.body["pagination"]["totalPages"], 2);

    let window = api
        .get("/api/v1/reservations?startDate=2024-09-03&endDate=2024-09-04")
        .await;
    assert_eq!(window.data()["reservations"].as_array().unwrap().len(), 1);

    let bad = api.get("/api/v1/reservations?status=SLEEPING").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.error_type(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_batch_and_free_resource_queries() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    let spare = api
        .post("/api/v1/resources", json!({"name": "Suite V1", "type": "VIP"}))
        .await;
    let spare_id = id_of(spare.data());
    api.post("/api/v1/reservations", seed.reservation("2024-10-01", "2024-10-03"))
        .await;

    let missing = uuid::Uuid::new_v4().to_string();
    let batch = api
        .post(
            "/api/v1/resources/availability/batch",
            json!({
                "resourceIds": [seed.resource_id, spare_id, missing],
                "startDate": "2024-10-02",
                "endDate": "2024-10-03",
            }),
        )
        .await;
    assert_eq!(batch.status, StatusCode::OK, "{}", batch.body);
    let entries = batch.data()["resources"].as_array().unwrap();
    assert_eq!(entries[0]["isAvailable"], false);
    assert_eq!(entries[1]["isAvailable"], true);
    assert!(entries[2]["error"].is_string());

    let free = api
        .get("/api/v1/resources/available?date=2024-10-02")
        .await;
    let names: Vec<_> = free.data()["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Suite V1".to_string()]);

    let standard_only = api
        .get("/api/v1/resources/available?date=2024-10-05&type=STANDARD")
        .await;
    assert_eq!(standard_only.data()["resources"].as_array().unwrap().len(), 1);

    let no_window = api.get("/api/v1/resources/available").await;
    assert_eq!(no_window.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_ids_and_routes_use_error_envelope() {
    let app = TestApp::new();
    let api = app.reservations();

    let missing = api
        .get(&format!("/api/v1/reservations/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error_type(), "RESOURCE_NOT_FOUND");

    let malformed = api.get("/api/v1/reservations/not-a-uuid").await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let unknown = api.without_tenant().get("/api/v1/nothing-here").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["status"], "error");
}

#[tokio::test]
async fn test_missing_catalog_tables_list_as_empty() {
    let app = TestApp::new();
    app.repo
        .simulate_missing_table(tailtown::db::repositories::local::tables::SERVICES);
    app.repo
        .simulate_missing_table(tailtown::db::repositories::local::tables::ADD_ONS);
    let api = app.reservations();

    let services = api.get("/api/v1/services").await;
    assert_eq!(services.status, StatusCode::OK);
    assert_eq!(services.data()["services"], json!([]));

    let add_ons = api.get("/api/v1/add-ons").await;
    assert_eq!(add_ons.status, StatusCode::OK);
    assert_eq!(add_ons.data()["addOns"], json!([]));
}

#[tokio::test]
async fn test_referenced_catalog_rows_conflict_on_delete() {
    let app = TestApp::new();
    let seed = seed_booking_data(&app).await;
    let api = app.reservations();

    let stay = api
        .post("/api/v1/reservations", seed.reservation("2024-08-01", "2024-08-03"))
        .await;
    let stay_id = id_of(stay.data());
    let add_on = api
        .post("/api/v1/add-ons", json!({"name": "Nail trim", "price": 15.0}))
        .await;
    assert_eq!(add_on.status, StatusCode::CREATED, "{}", add_on.body);
    let add_on_id = id_of(add_on.data());
    let attached = api
        .post(
            &format!("/api/v1/reservations/{}/add-ons", stay_id),
            json!({"addOnId": add_on_id}),
        )
        .await;
    assert_eq!(attached.status, StatusCode::CREATED, "{}", attached.body);

    let refused = api.delete(&format!("/api/v1/add-ons/{}", add_on_id)).await;
    assert_eq!(refused.status, StatusCode::CONFLICT);
    assert_eq!(refused.error_type(), "RESOURCE_CONFLICT");

    let busy = api.delete(&format!("/api/v1/resources/{}", seed.resource_id)).await;
    assert_eq!(busy.status, StatusCode::CONFLICT);
}
