use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    DirectoryUser, DirectoryError, DoctorSearchQuery, RegisterUserRequest,
    UpdateProfileRequest, UserRole,
};

pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Register a new directory user. `medical_id`, `username` and `email`
    /// must each be unused across the collection.
    pub async fn register_user(
        &self,
        request: RegisterUserRequest,
        auth_token: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        debug!("Registering directory user: {}", request.medical_id);

        if request.medical_id.trim().is_empty() {
            return Err(DirectoryError::ValidationError("medical_id is required".to_string()));
        }
        if request.username.trim().is_empty() {
            return Err(DirectoryError::ValidationError("username is required".to_string()));
        }
        if request.email.trim().is_empty() {
            return Err(DirectoryError::ValidationError("email is required".to_string()));
        }

        self.check_identity_free("medical_id", &request.medical_id, auth_token).await?;
        self.check_identity_free("username", &request.username, auth_token).await?;
        self.check_identity_free("email", &request.email, auth_token).await?;

        let now = Utc::now();
        let user_data = json!({
            "medical_id": request.medical_id,
            "role": request.role.to_string(),
            "username": request.username,
            "email": request.email,
            "phone": request.phone,
            "specialty": request.specialty,
            "location": request.location,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/directory_users",
            Some(auth_token),
            Some(user_data),
            Some(headers),
        ).await.map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DirectoryError::DatabaseError("Failed to register user".to_string()));
        }

        let user: DirectoryUser = serde_json::from_value(result[0].clone())
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse user: {}", e)))?;

        debug!("Directory user registered with ID: {}", user.id);
        Ok(user)
    }

    /// Look up a user by medical id. When `role` is given, a record with a
    /// different role counts as not found.
    pub async fn find_by_medical_id(
        &self,
        medical_id: &str,
        role: Option<UserRole>,
        auth_token: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        debug!("Looking up directory user: {}", medical_id);

        let mut path = format!(
            "/rest/v1/directory_users?medical_id=eq.{}",
            urlencoding::encode(medical_id)
        );
        if let Some(role) = role {
            path.push_str(&format!("&role=eq.{}", role));
        }

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DirectoryError::NotFound);
        }

        let user: DirectoryUser = serde_json::from_value(result[0].clone())
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse user: {}", e)))?;

        Ok(user)
    }

    /// Patient-facing doctor search, optionally narrowed by specialty and location.
    pub async fn list_doctors(
        &self,
        query: DoctorSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let mut path = "/rest/v1/directory_users?role=eq.doctor".to_string();

        if let Some(specialty) = query.specialty {
            path.push_str(&format!("&specialty=ilike.*{}*", urlencoding::encode(&specialty)));
        }
        if let Some(location) = query.location {
            path.push_str(&format!("&location=ilike.*{}*", urlencoding::encode(&location)));
        }
        path.push_str("&order=username.asc");

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let doctors: Vec<DirectoryUser> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DirectoryUser>, _>>()
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    /// Partial profile update. Existing appointment requests keep the name and
    /// email snapshot taken at creation; nothing here re-syncs them.
    pub async fn update_profile(
        &self,
        medical_id: &str,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        debug!("Updating profile for: {}", medical_id);

        // Confirm the record exists before patching.
        self.find_by_medical_id(medical_id, None, auth_token).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(username) = request.username {
            self.check_identity_free("username", &username, auth_token).await?;
            update_data.insert("username".to_string(), json!(username));
        }
        if let Some(email) = request.email {
            self.check_identity_free("email", &email, auth_token).await?;
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(location) = request.location {
            update_data.insert("location".to_string(), json!(location));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/directory_users?medical_id=eq.{}",
            urlencoding::encode(medical_id)
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DirectoryError::NotFound);
        }

        let user: DirectoryUser = serde_json::from_value(result[0].clone())
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse user: {}", e)))?;

        Ok(user)
    }

    /// Admin listing, optionally filtered by role.
    pub async fn list_users(
        &self,
        role: Option<UserRole>,
        auth_token: &str,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let mut path = "/rest/v1/directory_users?order=created_at.desc".to_string();
        if let Some(role) = role {
            path.push_str(&format!("&role=eq.{}", role));
        }

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let users: Vec<DirectoryUser> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DirectoryUser>, _>>()
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse users: {}", e)))?;

        Ok(users)
    }

    async fn check_identity_free(
        &self,
        column: &str,
        value: &str,
        auth_token: &str,
    ) -> Result<(), DirectoryError> {
        let path = format!(
            "/rest/v1/directory_users?{}=eq.{}&select=id",
            column,
            urlencoding::encode(value)
        );

        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DirectoryError::DuplicateIdentity(format!("{} '{}'", column, value)));
        }

        Ok(())
    }
}
