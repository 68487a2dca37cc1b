use std::sync::Arc;
use serde_json::json;
use chrono::NaiveDate;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, body_partial_json};

use notification_cell::models::{AppointmentNotice, NotificationOutcome};
use notification_cell::services::dispatcher::NotificationDispatcher;
use notification_cell::services::transport::{HttpGatewayTransport, NotificationTransport};
use shared_config::AppConfig;

fn gateway_config(gateway_url: &str) -> AppConfig {
    AppConfig {
        supabase_url: "http://localhost:54321".to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        meeting_link_base_url: "https://meet.jit.si".to_string(),
        notification_gateway_url: gateway_url.to_string(),
        notifications_enabled: true,
    }
}

fn approved_notice() -> AppointmentNotice {
    AppointmentNotice {
        patient_name: "Test Patient".to_string(),
        doctor_name: "Dr. Test".to_string(),
        patient_email: "patient@example.com".to_string(),
        doctor_email: "doctor@example.com".to_string(),
        contact_info: "pat1@example.com".to_string(),
        scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 2),
        scheduled_time: Some("11:00".to_string()),
        video_call_link: Some("https://meet.jit.si/CareConnectRoom".to_string()),
        doctor_response: Some("see you then".to_string()),
    }
}

fn dispatcher_for(config: &AppConfig) -> NotificationDispatcher {
    let transport = HttpGatewayTransport::new(config).unwrap();
    NotificationDispatcher::with_transport(Arc::new(transport))
}

#[tokio::test]
async fn approval_emails_patient_and_doctor() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "type": "email",
            "to": "pat1@example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sent": true})))
        .expect(1)
        .mount(&gateway)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "type": "email",
            "to": "doctor@example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sent": true})))
        .expect(1)
        .mount(&gateway)
        .await;

    let config = gateway_config(&gateway.uri());
    let dispatcher = dispatcher_for(&config);

    dispatcher.notify(NotificationOutcome::Approved, &approved_notice()).await;
}

#[tokio::test]
async fn rejection_emails_only_the_patient() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sent": true})))
        .expect(1)
        .mount(&gateway)
        .await;

    let config = gateway_config(&gateway.uri());
    let dispatcher = dispatcher_for(&config);

    let mut notice = approved_notice();
    notice.video_call_link = None;
    notice.doctor_response = Some("not available".to_string());

    dispatcher.notify(NotificationOutcome::Rejected, &notice).await;

    let requests = gateway.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["to"], "pat1@example.com");
    assert!(body["text"].as_str().unwrap().contains("not available"));
}

#[tokio::test]
async fn gateway_failure_is_swallowed() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("gateway down"))
        .mount(&gateway)
        .await;

    let config = gateway_config(&gateway.uri());
    let dispatcher = dispatcher_for(&config);

    // Must complete without panicking or propagating anything.
    dispatcher.notify(NotificationOutcome::Approved, &approved_notice()).await;
}

#[tokio::test]
async fn unconfigured_dispatcher_skips_delivery() {
    let mut config = gateway_config("");
    config.notifications_enabled = false;

    let dispatcher = NotificationDispatcher::new(&config);
    dispatcher.notify(NotificationOutcome::Approved, &approved_notice()).await;
}

#[tokio::test]
async fn transport_reports_http_errors() {
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad upstream"))
        .mount(&gateway)
        .await;

    let config = gateway_config(&gateway.uri());
    let transport = HttpGatewayTransport::new(&config).unwrap();

    let result = transport.send(&notification_cell::models::OutboundNotification {
        channel: notification_cell::models::NotificationChannel::Email,
        to: "pat1@example.com".to_string(),
        subject: "subject".to_string(),
        body: "body".to_string(),
    }).await;

    assert!(result.is_err());
}
