use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    /// Public medical identifier carried as a custom claim, used for
    /// party checks on appointment requests.
    pub medical_id: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub medical_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// True when this principal's medical id matches the given one.
    pub fn is_party(&self, medical_id: &str) -> bool {
        self.medical_id.as_deref() == Some(medical_id)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub medical_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}
