// libs/availability-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};

use appointment_request_cell::models::MeetingType;

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// One bookable unit of a doctor's day. Stored one row per slot so a booking
/// is a single conditional update on exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub doctor_medical_id: String,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    pub is_available: bool,
    /// Set when the slot was claimed through direct booking; links back to
    /// the appointment request that owns it.
    pub booked_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A day's slots as exposed to clients, grouped from the per-slot rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub time: String,
    pub available: bool,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotInput {
    pub time: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// Replace a whole day's slot list for a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDayAvailabilityRequest {
    pub date: NaiveDate,
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub from_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub doctor_medical_id: String,
    pub patient_medical_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub symptoms: String,
    pub contact_info: String,
    #[serde(default)]
    pub meeting_type: MeetingType,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Slot not available")]
    SlotUnavailable,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
