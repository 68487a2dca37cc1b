// libs/directory-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    DirectoryError, DoctorSearchQuery, RegisterUserRequest, UpdateProfileRequest, UserRole,
};
use crate::services::directory::DirectoryService;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
}

fn map_directory_error(e: DirectoryError) -> AppError {
    match e {
        DirectoryError::NotFound => AppError::NotFound("User not found".to_string()),
        DirectoryError::DuplicateIdentity(msg) => AppError::Conflict(msg),
        DirectoryError::ValidationError(msg) => AppError::ValidationError(msg),
        DirectoryError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

/// Registration is the one unauthenticated directory route; the store is
/// addressed with the anon key.
#[axum::debug_handler]
pub async fn register_user(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);

    let user = service.register_user(request, &state.supabase_anon_key).await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "message": "User registered successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<AppConfig>>,
    Path(medical_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = DirectoryService::new(&state);

    let user = service.find_by_medical_id(&medical_id, None, token).await
        .map_err(map_directory_error)?;

    Ok(Json(json!(user)))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<AppConfig>>,
    Path(medical_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_party(&medical_id) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this profile".to_string()));
    }

    let service = DirectoryService::new(&state);

    let updated = service.update_profile(&medical_id, request, token).await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "success": true,
        "user": updated,
        "message": "Profile updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = DirectoryService::new(&state);

    let doctors = service.list_doctors(query, token).await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<UserListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Auth("Admin access required".to_string()));
    }

    let service = DirectoryService::new(&state);

    let users = service.list_users(query.role, token).await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "users": users,
        "total": users.len()
    })))
}
