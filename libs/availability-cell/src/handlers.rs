// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use appointment_request_cell::services::requests::AppointmentRequestService;

use crate::models::{AvailabilityError, AvailabilityQuery, BookSlotRequest, SetDayAvailabilityRequest};
use crate::services::ledger::AvailabilityLedgerService;

fn map_availability_error(e: AvailabilityError) -> AppError {
    match e {
        AvailabilityError::SlotUnavailable => AppError::Conflict("Slot not available".to_string()),
        AvailabilityError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AvailabilityError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        AvailabilityError::BookingNotFound => AppError::NotFound("Booking not found".to_string()),
        AvailabilityError::ValidationError(msg) => AppError::ValidationError(msg),
        AvailabilityError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_medical_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetDayAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_party(&doctor_medical_id) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to edit this doctor's availability".to_string()));
    }

    let service = AvailabilityLedgerService::new(&state);

    let day = service.set_day_availability(&doctor_medical_id, request, token).await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": day,
        "message": "Availability updated"
    })))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_medical_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AvailabilityLedgerService::new(&state);

    let days = service.get_availability(&doctor_medical_id, query.from_date, token).await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "doctor_medical_id": doctor_medical_id,
        "availability": days
    })))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_party(&request.patient_medical_id) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to book for this patient".to_string()));
    }

    let service = AvailabilityLedgerService::new(&state);

    let booked = service.book_slot(request, token).await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "request": booked,
        "message": "Slot booked"
    })))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<AppConfig>>,
    Path(request_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Either party on the unified request may cancel its booking.
    let request_service = AppointmentRequestService::new(&state);
    let request = request_service.get_request(request_id, token).await
        .map_err(|e| match e {
            appointment_request_cell::models::RequestError::NotFound => {
                AppError::NotFound("Booking not found".to_string())
            }
            other => AppError::Internal(other.to_string()),
        })?;

    let is_party = user.is_party(&request.doctor_medical_id)
        || user.is_party(&request.patient_medical_id);
    if !is_party && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to cancel this booking".to_string()));
    }

    let service = AvailabilityLedgerService::new(&state);

    let cancelled = service.cancel_booking(request_id, token).await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "request": cancelled,
        "message": "Booking cancelled"
    })))
}
