mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Harness;
use vehicle_registry::config::EnvironmentConfig;
use vehicle_registry::models::auth::UserRole;
use vehicle_registry::models::VehicleStatus;
use vehicle_registry::utils::jwt::{generate_token, JwtConfig};
use vehicle_registry::{create_router, AppState};

struct Api {
    harness: Harness,
    router: Router,
    jwt: JwtConfig,
}

impl Api {
    fn new() -> Self {
        let harness = Harness::new();
        let config = EnvironmentConfig::from_lookup(|_| None).unwrap();
        let jwt = JwtConfig::from(&config);
        let router = create_router(AppState::new(config, harness.lifecycle.clone()));
        Self { harness, router, jwt }
    }

    fn token(&self, user_id: &str, role: UserRole) -> String {
        generate_token(user_id, Some(&format!("User {}", user_id)), role, 3600, &self.jwt).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

fn document() -> Value {
    json!({
        "fileName": "scan.pdf",
        "contentBase64": STANDARD.encode(b"%PDF-1.4"),
    })
}

fn new_registration_body(vehicle_id: i64) -> Value {
    json!({
        "vehicleId": vehicle_id,
        "type": "New",
        "technicalInspectionDate": (Utc::now() - chrono::Duration::days(3)).format("%Y-%m-%d").to_string(),
        "insuranceDocument": document(),
        "technicalInspectionDocument": document(),
        "identityDocument": document(),
    })
}

#[tokio::test]
async fn health_is_public() {
    let api = Api::new();
    let (status, body) = api.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let response = api
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_requires_valid_token() {
    let api = Api::new();
    let (status, body) = api
        .call(Method::GET, "/api/registration-requests/my-requests", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = api
        .call(Method::GET, "/api/registration-requests/my-requests", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_vehicle_and_validate_shape() {
    let api = Api::new();
    let token = api.token("alice", UserRole::User);

    let (status, body) = api
        .call(
            Method::POST,
            "/api/vehicles",
            Some(&token),
            Some(json!({"registrationNumber": "NI-321-KK", "make": "Opel", "model": "Corsa", "year": 2015})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "unregistered");
    assert_eq!(body["data"]["ownerId"], "alice");

    let (status, body) = api
        .call(
            Method::POST,
            "/api/vehicles",
            Some(&token),
            Some(json!({"registrationNumber": "NI-322-KK", "make": "Opel", "model": "Corsa", "year": 1850})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = api
        .call(
            Method::POST,
            "/api/vehicles",
            Some(&token),
            Some(json!({"registrationNumber": "!!", "make": "Opel", "model": "Corsa", "year": 2015})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submission_accepts_realistic_scans() {
    let api = Api::new();
    let vehicle = api
        .harness
        .vehicle("alice", VehicleStatus::Unregistered, None)
        .await;
    let token = api.token("alice", UserRole::User);

    // tres escaneos de 1 MB: unos 4 MB de JSON
    let scan = json!({
        "fileName": "scan.pdf",
        "contentBase64": STANDARD.encode(vec![0x25u8; 1024 * 1024]),
    });
    let mut body = new_registration_body(vehicle.id);
    body["insuranceDocument"] = scan.clone();
    body["technicalInspectionDocument"] = scan.clone();
    body["identityDocument"] = scan;
    assert!(body.to_string().len() > 2 * 1024 * 1024);

    let (status, body) = api
        .call(Method::POST, "/api/registration-requests", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "Pending");
    assert!(body["data"]["insuranceDocPath"].is_string());
}

#[tokio::test]
async fn duplicate_submission_returns_conflict() {
    let api = Api::new();
    let vehicle = api
        .harness
        .vehicle("alice", VehicleStatus::Unregistered, None)
        .await;
    let token = api.token("alice", UserRole::User);

    let (status, body) = api
        .call(
            Method::POST,
            "/api/registration-requests",
            Some(&token),
            Some(new_registration_body(vehicle.id)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "Pending");

    let (status, body) = api
        .call(
            Method::POST,
            "/api/registration-requests",
            Some(&token),
            Some(new_registration_body(vehicle.id)),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PENDING_REQUEST_EXISTS");
    assert_eq!(body["details"]["violations"][0]["code"], "pending_request_exists");
}

#[tokio::test]
async fn review_flow_over_http() {
    let api = Api::new();
    let vehicle = api
        .harness
        .vehicle("alice", VehicleStatus::Unregistered, None)
        .await;
    let owner = api.token("alice", UserRole::User);
    let reviewer = api.token("root", UserRole::Admin);

    let (_, body) = api
        .call(
            Method::POST,
            "/api/registration-requests",
            Some(&owner),
            Some(new_registration_body(vehicle.id)),
        )
        .await;
    let request_id = body["data"]["id"].as_i64().unwrap();
    let review_uri = format!("/api/registration-requests/{}/review", request_id);

    let (status, _) = api
        .call(Method::POST, &review_uri, Some(&owner), Some(json!({"approve": true})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = api
        .call(Method::POST, &review_uri, Some(&reviewer), Some(json!({"approve": false})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "RULES_VIOLATED");

    let (status, body) = api
        .call(
            Method::GET,
            "/api/registration-requests?status=pending",
            Some(&reviewer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = api
        .call(Method::POST, &review_uri, Some(&reviewer), Some(json!({"approve": true})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Approved");
    assert_eq!(api.harness.reload(vehicle.id).await.status, VehicleStatus::Registered);

    let (status, _) = api
        .call(
            Method::GET,
            "/api/registration-requests?status=bogus",
            Some(&reviewer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fines_gate_reports_amount() {
    let api = Api::new();
    let vehicle = api
        .harness
        .vehicle("alice", VehicleStatus::Registered, Some(200))
        .await;
    let alice = api.token("alice", UserRole::User);
    let bob = api.token("bob", UserRole::User);

    let (status, body) = api
        .call(
            Method::POST,
            "/api/vehicle-transfers",
            Some(&alice),
            Some(json!({"vehicleId": vehicle.id, "toUserId": "bob"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let transfer_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = api
        .call(Method::GET, "/api/vehicle-transfers/pending-received", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    api.harness
        .enforcement
        .set_fines(&vehicle.registration_number, Decimal::new(3000, 0));
    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/vehicle-transfers/{}/respond", transfer_id),
            Some(&bob),
            Some(json!({"accept": true})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "OUTSTANDING_FINES");
    assert!(body["details"]["fineAmount"].to_string().contains("3000"));
    assert_eq!(api.harness.reload(vehicle.id).await.owner_id, "alice");
}

#[tokio::test]
async fn ownership_history_and_deregistration_routes() {
    let api = Api::new();
    let vehicle = api
        .harness
        .vehicle("alice", VehicleStatus::Registered, Some(200))
        .await;
    let alice = api.token("alice", UserRole::User);

    let (status, body) = api
        .call(
            Method::GET,
            &format!("/api/vehicles/{}/ownership-history", vehicle.id),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["ownerId"], "alice");
    assert!(body["data"][0]["toDate"].is_null());

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/vehicles/{}/deregister", vehicle.id),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "deregistered");

    let (status, body) = api
        .call(Method::GET, "/api/vehicles/424242/ownership-history", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn expiring_vehicles_route() {
    let api = Api::new();
    let soon = api
        .harness
        .vehicle("alice", VehicleStatus::Registered, Some(12))
        .await;
    api.harness
        .vehicle("bob", VehicleStatus::Registered, Some(90))
        .await;
    let reviewer = api.token("root", UserRole::Admin);
    let alice = api.token("alice", UserRole::User);

    let (status, body) = api
        .call(Method::GET, "/api/vehicles/expiring", Some(&reviewer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["registrationNumber"], soon.registration_number.as_str());

    let (status, body) = api
        .call(Method::GET, "/api/vehicles/expiring?days=120", Some(&reviewer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = api
        .call(Method::GET, "/api/vehicles/expiring?days=0", Some(&reviewer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .call(Method::GET, "/api/vehicles/expiring", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
