//! HTTP harness: both routers over one in-memory repository.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tailtown::config::ServiceConfig;
use tailtown::db::repositories::LocalRepository;
use tailtown::http::{customer_router, reservation_router, AppState};

pub const DEV_TENANT: &str = "dev";

/// Both routers over one in-memory repository seeded with the `dev` tenant.
pub struct TestApp {
    pub repo: Arc<LocalRepository>,
    pub customers: Router,
    pub reservations: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let repo = Arc::new(LocalRepository::with_demo_tenant(DEV_TENANT));
        let customers = customer_router(AppState::new(
            "customer-service",
            repo.clone(),
            config.clone(),
        ));
        let reservations =
            reservation_router(AppState::new("reservation-service", repo.clone(), config));
        Self {
            repo,
            customers,
            reservations,
        }
    }

    pub fn customers(&self) -> Client {
        Client::new(self.customers.clone())
    }

    pub fn reservations(&self) -> Client {
        Client::new(self.reservations.clone())
    }
}

/// Development settings with a fixed tax rate and no default tenant, so
/// every request names its tenant explicitly.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::new(0);
    config.default_tenant = None;
    config.tax_rate = 0.1;
    config
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_type(&self) -> &str {
        self.body["error"]["type"].as_str().unwrap_or_default()
    }
}

/// Request builder bound to one router, tenant and optional bearer token.
#[derive(Clone)]
pub struct Client {
    router: Router,
    tenant: Option<String>,
    token: Option<String>,
}

impl Client {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            tenant: Some(DEV_TENANT.to_string()),
            token: None,
        }
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn without_tenant(mut self) -> Self {
        self.tenant = None;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Reply {
        self.send(Method::POST, uri, Some(body), &[]).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Reply {
        self.send(Method::PUT, uri, Some(body), &[]).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Reply {
        self.send(Method::PATCH, uri, Some(body), &[]).await
    }

    pub async fn delete(&self, uri: &str) -> Reply {
        self.send(Method::DELETE, uri, None, &[]).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tenant) = &self.tenant {
            builder = builder.header("x-tenant-id", tenant.as_str());
        }
        if let Some(token) = &self.token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Reply {
            status,
            headers,
            body,
        }
    }
}

// =============================================================================
// Seed data
// =============================================================================

/// Ids of one customer with a dog, a boarding service at 45/night and a
/// standard kennel.
pub struct Seed {
    pub customer_id: String,
    pub pet_id: String,
    pub service_id: String,
    pub resource_id: String,
}

pub async fn seed_booking_data(app: &TestApp) -> Seed {
    let customers = app.customers();
    let reservations = app.reservations();

    let customer = customers
        .post(
            "/api/v1/customers",
            json!({"firstName": "Grace", "lastName": "Hopper", "email": "grace@example.com"}),
        )
        .await;
    assert_eq!(customer.status, StatusCode::CREATED, "{}", customer.body);
    let customer_id = id_of(customer.data());

    let pet = customers
        .post(
            "/api/v1/pets",
            json!({"customerId": customer_id, "name": "Biscuit", "type": "DOG"}),
        )
        .await;
    assert_eq!(pet.status, StatusCode::CREATED, "{}", pet.body);

    let service = reservations
        .post(
            "/api/v1/services",
            json!({"name": "Overnight boarding", "serviceCategory": "BOARDING", "price": 45.0}),
        )
        .await;
    assert_eq!(service.status, StatusCode::CREATED, "{}", service.body);

    let resource = reservations
        .post("/api/v1/resources", json!({"name": "Kennel A1", "type": "STANDARD"}))
        .await;
    assert_eq!(resource.status, StatusCode::CREATED, "{}", resource.body);

    Seed {
        customer_id,
        pet_id: id_of(pet.data()),
        service_id: id_of(service.data()),
        resource_id: id_of(resource.data()),
    }
}

impl Seed {
    pub fn reservation(&self, start: &str, end: &str) -> Value {
        json!({
            "customerId": self.customer_id,
            "petId": self.pet_id,
            "serviceId": self.service_id,
            "resourceId": self.resource_id,
            "startDate": start,
            "endDate": end,
        })
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("entity id").to_string()
}
