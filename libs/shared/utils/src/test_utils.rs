use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub notification_gateway_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            notification_gateway_url: String::new(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            meeting_link_base_url: "https://meet.jit.si".to_string(),
            notification_gateway_url: self.notification_gateway_url.clone(),
            notifications_enabled: !self.notification_gateway_url.is_empty(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub medical_id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            medical_id: "PAT1".to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(medical_id: &str, email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            medical_id: medical_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(medical_id: &str) -> Self {
        Self::new(medical_id, "doctor@example.com", "doctor")
    }

    pub fn patient(medical_id: &str) -> Self {
        Self::new(medical_id, "patient@example.com", "patient")
    }

    pub fn admin() -> Self {
        Self::new("ADM1", "admin@example.com", "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            medical_id: Some(self.medical_id.clone()),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "medical_id": user.medical_id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn directory_user_response(medical_id: &str, role: &str, username: &str, email: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "medical_id": medical_id,
            "role": role,
            "username": username,
            "email": email,
            "phone": "0851234567",
            "specialty": if role == "doctor" { json!("General Practice") } else { json!(null) },
            "location": if role == "doctor" { json!("Dublin") } else { json!(null) },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_request_response(
        id: Uuid,
        doctor_medical_id: &str,
        patient_medical_id: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "doctor_medical_id": doctor_medical_id,
            "patient_medical_id": patient_medical_id,
            "doctor_name": "Dr. Test",
            "patient_name": "Test Patient",
            "doctor_email": "doctor@example.com",
            "patient_email": "patient@example.com",
            "preferred_date": "2025-06-01",
            "preferred_time": "10:00",
            "scheduled_date": null,
            "scheduled_time": null,
            "meeting_type": "offline",
            "notification_type": "email",
            "status": status,
            "symptoms": "fever",
            "contact_info": "patient@example.com",
            "conversation": [],
            "doctor_response": null,
            "video_call_link": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn availability_slot_response(
        doctor_medical_id: &str,
        slot_date: &str,
        slot_time: &str,
        is_available: bool,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_medical_id": doctor_medical_id,
            "slot_date": slot_date,
            "slot_time": slot_time,
            "is_available": is_available,
            "booked_request_id": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
