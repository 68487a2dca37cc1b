use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use appointment_request_cell::router::appointment_request_routes;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockSupabaseResponses};

fn create_test_app(mock_server: &MockServer) -> (Router, String) {
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = appointment_request_routes(Arc::new(config.to_app_config()));
    (app, config.jwt_secret)
}

fn bearer_request(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder.body(Body::from(json_body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn create_request_returns_201_for_the_patient() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let patient = TestUser::patient("PAT1");
    let token = JwtTestUtils::create_test_token(&patient, &secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/directory_users"))
        .and(query_param("medical_id", "eq.DOC1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::directory_user_response("DOC1", "doctor", "Dr. Test", "doctor@example.com")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/directory_users"))
        .and(query_param("medical_id", "eq.PAT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::directory_user_response("PAT1", "patient", "Test Patient", "patient@example.com")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_requests"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_request_response(Uuid::new_v4(), "DOC1", "PAT1", "pending")
        ])))
        .mount(&mock_server)
        .await;

    let request = bearer_request("POST", "/", &token, Some(json!({
        "doctor_medical_id": "DOC1",
        "patient_medical_id": "PAT1",
        "preferred_date": "2025-06-01",
        "preferred_time": "10:00",
        "symptoms": "fever",
        "contact_info": "pat1@example.com",
        "meeting_type": "online"
    })));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json_response = response_json(response).await;
    assert_eq!(json_response["success"], true);
    assert_eq!(json_response["request"]["status"], "pending");
}

#[tokio::test]
async fn create_request_for_another_patient_is_rejected() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let intruder = TestUser::patient("PAT2");
    let token = JwtTestUtils::create_test_token(&intruder, &secret, Some(24));

    let request = bearer_request("POST", "/", &token, Some(json!({
        "doctor_medical_id": "DOC1",
        "patient_medical_id": "PAT1",
        "preferred_date": "2025-06-01",
        "preferred_time": "10:00",
        "symptoms": "fever",
        "contact_info": "pat1@example.com"
    })));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_request_without_token_is_rejected() {
    let mock_server = MockServer::start().await;
    let (app, _secret) = create_test_app(&mock_server);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_doctor_maps_to_404() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let patient = TestUser::patient("PAT1");
    let token = JwtTestUtils::create_test_token(&patient, &secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/directory_users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = bearer_request("POST", "/", &token, Some(json!({
        "doctor_medical_id": "NOPE",
        "patient_medical_id": "PAT1",
        "preferred_date": "2025-06-01",
        "preferred_time": "10:00",
        "symptoms": "fever",
        "contact_info": "pat1@example.com"
    })));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json_response = response_json(response).await;
    assert_eq!(json_response["error"], "Doctor not found");
}

#[tokio::test]
async fn doctor_listing_is_scoped_to_the_caller() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let doctor = TestUser::doctor("DOC1");
    let token = JwtTestUtils::create_test_token(&doctor, &secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .and(query_param("doctor_medical_id", "eq.DOC1"))
        .and(query_param("status", "in.(pending,approved)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_request_response(Uuid::new_v4(), "DOC1", "PAT1", "pending")
        ])))
        .mount(&mock_server)
        .await;

    let response = app.clone()
        .oneshot(bearer_request("GET", "/doctor/DOC1", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = response_json(response).await;
    assert_eq!(json_response["total"], 1);

    // The same doctor asking for someone else's queue is refused.
    let response = app
        .oneshot(bearer_request("GET", "/doctor/DOC2", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patient_cannot_approve_their_own_request() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let patient = TestUser::patient("PAT1");
    let token = JwtTestUtils::create_test_token(&patient, &secret, Some(24));

    let request_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_request_response(request_id, "DOC1", "PAT1", "pending")
        ])))
        .mount(&mock_server)
        .await;

    let request = bearer_request(
        "PUT",
        &format!("/{}/status", request_id),
        &token,
        Some(json!({ "status": "approved" })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patient_may_cancel_their_own_request() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let patient = TestUser::patient("PAT1");
    let token = JwtTestUtils::create_test_token(&patient, &secret, Some(24));

    let request_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_request_response(request_id, "DOC1", "PAT1", "pending")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointment_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_request_response(request_id, "DOC1", "PAT1", "cancelled")
        ])))
        .mount(&mock_server)
        .await;

    let request = bearer_request(
        "PUT",
        &format!("/{}/status", request_id),
        &token,
        Some(json!({ "status": "cancelled" })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = response_json(response).await;
    assert_eq!(json_response["request"]["status"], "cancelled");
}

#[tokio::test]
async fn fetching_missing_request_returns_404() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let doctor = TestUser::doctor("DOC1");
    let token = JwtTestUtils::create_test_token(&doctor, &secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(bearer_request("GET", &format!("/{}", Uuid::new_v4()), &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_require_admin() {
    let mock_server = MockServer::start().await;
    let (app, secret) = create_test_app(&mock_server);

    let patient = TestUser::patient("PAT1");
    let patient_token = JwtTestUtils::create_test_token(&patient, &secret, Some(24));

    let response = app.clone()
        .oneshot(bearer_request("GET", "/stats", &patient_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let admin = TestUser::admin();
    let admin_token = JwtTestUtils::create_test_token(&admin, &secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "status": "pending", "meeting_type": "offline" }
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(bearer_request("GET", "/stats", &admin_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = response_json(response).await;
    assert_eq!(json_response["stats"]["total_requests"], 1);
}
