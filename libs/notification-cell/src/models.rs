// libs/notification-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// NOTIFICATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Email => write!(f, "email"),
            NotificationChannel::Sms => write!(f, "sms"),
        }
    }
}

/// One message handed to the outbound transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub channel: NotificationChannel,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// The slice of an appointment request the dispatcher needs to compose
/// messages. Built by the request store at the call site so this crate does
/// not depend on the request model.
#[derive(Debug, Clone)]
pub struct AppointmentNotice {
    pub patient_name: String,
    pub doctor_name: String,
    pub patient_email: String,
    pub doctor_email: String,
    pub contact_info: String,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub video_call_link: Option<String>,
    pub doctor_response: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification transport not configured")]
    NotConfigured,

    #[error("Transport error: {0}")]
    Transport(String),
}
