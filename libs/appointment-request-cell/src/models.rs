// libs/appointment-request-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT REQUEST MODELS
// ==============================================================================

/// The primary workflow entity: a patient's ask for a doctor's time.
///
/// Party names and emails are a snapshot taken when the request is created;
/// later profile edits in the directory are deliberately not reflected here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub id: Uuid,
    pub doctor_medical_id: String,
    pub patient_medical_id: String,
    pub doctor_name: String,
    pub patient_name: String,
    pub doctor_email: String,
    pub patient_email: String,
    pub preferred_date: NaiveDate,
    /// Time of day as submitted by the client, e.g. "10:00". Kept opaque:
    /// it is compared and templated, never computed with.
    pub preferred_time: String,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub meeting_type: MeetingType,
    pub notification_type: NotificationType,
    pub status: RequestStatus,
    pub symptoms: String,
    pub contact_info: String,
    #[serde(default)]
    pub conversation: Vec<ConversationMessage>,
    pub doctor_response: Option<DoctorResponse>,
    pub video_call_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Approved => write!(f, "approved"),
            RequestStatus::Rejected => write!(f, "rejected"),
            RequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    Online,
    #[default]
    Offline,
}

impl fmt::Display for MeetingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingType::Online => write!(f, "online"),
            MeetingType::Offline => write!(f, "offline"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[default]
    Email,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::Email => write!(f, "email"),
        }
    }
}

/// One entry in the embedded message thread. Append-only; entries are never
/// edited or removed individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: String,
    pub sender_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The doctor's note attached to an approve/reject decision. Replaced
/// wholesale when the doctor acts again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorResponse {
    pub message: String,
    pub responded_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestPayload {
    pub doctor_medical_id: String,
    pub patient_medical_id: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: String,
    pub symptoms: String,
    pub contact_info: String,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub meeting_type: MeetingType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: RequestStatus,
    pub doctor_response: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestStats {
    pub total_requests: i32,
    pub pending_requests: i32,
    pub approved_requests: i32,
    pub rejected_requests: i32,
    pub cancelled_requests: i32,
    pub online_meetings: i32,
    pub offline_meetings: i32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum RequestError {
    #[error("Appointment request not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
