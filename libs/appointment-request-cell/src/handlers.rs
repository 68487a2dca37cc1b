// libs/appointment-request-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AddMessagePayload, AppointmentRequest, CreateRequestPayload, RequestError,
    RequestStatus, UpdateStatusPayload,
};
use crate::services::requests::AppointmentRequestService;

fn map_request_error(e: RequestError) -> AppError {
    match e {
        RequestError::NotFound => AppError::NotFound("Appointment request not found".to_string()),
        RequestError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        RequestError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        RequestError::ValidationError(msg) => AppError::ValidationError(msg),
        RequestError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

fn is_request_party(user: &User, request: &AppointmentRequest) -> bool {
    user.is_party(&request.doctor_medical_id) || user.is_party(&request.patient_medical_id)
}

// ==============================================================================
// REQUEST LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_request(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateRequestPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();

    // Patients create their own requests; admins may create on their behalf.
    if !user.is_party(&payload.patient_medical_id) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to create a request for this patient".to_string()));
    }

    let service = AppointmentRequestService::new(&state);

    let request = service.create_request(payload, token).await
        .map_err(map_request_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "request": request,
        "message": "Appointment request submitted"
    }))))
}

#[axum::debug_handler]
pub async fn get_request(
    State(state): State<Arc<AppConfig>>,
    Path(request_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentRequestService::new(&state);

    let request = service.get_request(request_id, token).await
        .map_err(map_request_error)?;

    if !is_request_party(&user, &request) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this request".to_string()));
    }

    Ok(Json(json!({ "request": request })))
}

#[axum::debug_handler]
pub async fn list_for_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_medical_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_party(&doctor_medical_id) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view requests for this doctor".to_string()));
    }

    let service = AppointmentRequestService::new(&state);

    let requests = service.list_for_doctor(&doctor_medical_id, token).await
        .map_err(map_request_error)?;

    Ok(Json(json!({
        "requests": requests,
        "total": requests.len()
    })))
}

#[axum::debug_handler]
pub async fn list_for_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_medical_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_party(&patient_medical_id) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view requests for this patient".to_string()));
    }

    let service = AppointmentRequestService::new(&state);

    let requests = service.list_for_patient(&patient_medical_id, token).await
        .map_err(map_request_error)?;

    Ok(Json(json!({
        "requests": requests,
        "total": requests.len()
    })))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    Path(request_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentRequestService::new(&state);

    let request = service.get_request(request_id, token).await
        .map_err(map_request_error)?;

    // The doctor on the request decides; the patient may only cancel.
    let is_doctor = user.is_party(&request.doctor_medical_id);
    let is_patient_cancelling =
        user.is_party(&request.patient_medical_id) && payload.status == RequestStatus::Cancelled;

    if !is_doctor && !is_patient_cancelling && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to update this request".to_string()));
    }

    let updated = service.update_status(request_id, payload, token).await
        .map_err(map_request_error)?;

    Ok(Json(json!({
        "success": true,
        "request": updated,
        "message": format!("Request is now {}", updated.status)
    })))
}

#[axum::debug_handler]
pub async fn add_message(
    State(state): State<Arc<AppConfig>>,
    Path(request_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(payload): Json<AddMessagePayload>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentRequestService::new(&state);

    let request = service.get_request(request_id, token).await
        .map_err(map_request_error)?;

    if !is_request_party(&user, &request) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to message on this request".to_string()));
    }

    let sender_medical_id = user.medical_id.clone()
        .ok_or_else(|| AppError::Auth("Token carries no medical id".to_string()))?;

    let updated = service.add_message(request_id, &sender_medical_id, payload, token).await
        .map_err(map_request_error)?;

    Ok(Json(json!({
        "success": true,
        "request": updated
    })))
}

// ==============================================================================
// ANALYTICS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_request_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Auth("Admin access required".to_string()));
    }

    let service = AppointmentRequestService::new(&state);

    let stats = service.request_stats(token).await
        .map_err(map_request_error)?;

    Ok(Json(json!({ "stats": stats })))
}
