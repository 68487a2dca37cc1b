// libs/availability-cell/src/services/ledger.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use directory_cell::models::{DirectoryError, UserRole};
use directory_cell::services::directory::DirectoryService;
use appointment_request_cell::models::{
    AppointmentRequest, CreateRequestPayload, RequestError, RequestStatus, UpdateStatusPayload,
};
use appointment_request_cell::services::requests::AppointmentRequestService;

use crate::models::{
    AvailabilityError, AvailabilitySlot, DayAvailability, SetDayAvailabilityRequest,
    SlotView, BookSlotRequest,
};

/// Per-doctor slot ledger and the direct-booking path on top of it.
///
/// Direct bookings are not a parallel entity: a successful booking claims the
/// slot and then runs through the appointment request store, ending up as an
/// approved request. Cancellation is status-based there too, so nothing in
/// this cell ever hard-deletes a booking.
pub struct AvailabilityLedgerService {
    supabase: SupabaseClient,
    directory: DirectoryService,
    requests: AppointmentRequestService,
}

impl AvailabilityLedgerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
            requests: AppointmentRequestService::new(config),
        }
    }

    /// Replace a doctor's slot list for one day: delete the day's rows, then
    /// insert the submitted set. At most one entry per (doctor, date) holds
    /// by construction.
    pub async fn set_day_availability(
        &self,
        doctor_medical_id: &str,
        request: SetDayAvailabilityRequest,
        auth_token: &str,
    ) -> Result<DayAvailability, AvailabilityError> {
        info!("Replacing availability for doctor {} on {}", doctor_medical_id, request.date);

        if request.slots.is_empty() {
            return Err(AvailabilityError::ValidationError("at least one slot is required".to_string()));
        }
        for slot in &request.slots {
            if slot.time.trim().is_empty() {
                return Err(AvailabilityError::ValidationError("slot time is required".to_string()));
            }
        }

        self.directory
            .find_by_medical_id(doctor_medical_id, Some(UserRole::Doctor), auth_token)
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound => AvailabilityError::DoctorNotFound,
                other => AvailabilityError::DatabaseError(other.to_string()),
            })?;

        let date_str = request.date.format("%Y-%m-%d").to_string();
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let delete_path = format!(
            "/rest/v1/availability_slots?doctor_medical_id=eq.{}&slot_date=eq.{}",
            urlencoding::encode(doctor_medical_id),
            date_str
        );
        let _deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &delete_path,
            Some(auth_token),
            None,
            Some(headers.clone()),
        ).await.map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let now = Utc::now();
        let rows: Vec<Value> = request.slots.iter().map(|slot| json!({
            "doctor_medical_id": doctor_medical_id,
            "slot_date": date_str,
            "slot_time": slot.time,
            "is_available": slot.available,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        })).collect();

        let inserted: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/availability_slots",
            Some(auth_token),
            Some(Value::Array(rows)),
            Some(headers),
        ).await.map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let slots: Vec<AvailabilitySlot> = inserted.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilitySlot>, _>>()
            .map_err(|e| AvailabilityError::DatabaseError(format!("Failed to parse slots: {}", e)))?;

        Ok(DayAvailability {
            date: request.date,
            slots: slots.into_iter()
                .map(|s| SlotView { time: s.slot_time, available: s.is_available })
                .collect(),
        })
    }

    /// A doctor's slots grouped by day, optionally from a given date forward.
    pub async fn get_availability(
        &self,
        doctor_medical_id: &str,
        from_date: Option<chrono::NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<DayAvailability>, AvailabilityError> {
        debug!("Fetching availability for doctor: {}", doctor_medical_id);

        let mut path = format!(
            "/rest/v1/availability_slots?doctor_medical_id=eq.{}",
            urlencoding::encode(doctor_medical_id)
        );
        if let Some(from) = from_date {
            path.push_str(&format!("&slot_date=gte.{}", from.format("%Y-%m-%d")));
        }
        path.push_str("&order=slot_date.asc,slot_time.asc");

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let slots: Vec<AvailabilitySlot> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilitySlot>, _>>()
            .map_err(|e| AvailabilityError::DatabaseError(format!("Failed to parse slots: {}", e)))?;

        let mut days: Vec<DayAvailability> = Vec::new();
        for slot in slots {
            match days.last_mut() {
                Some(day) if day.date == slot.slot_date => {
                    day.slots.push(SlotView { time: slot.slot_time, available: slot.is_available });
                }
                _ => days.push(DayAvailability {
                    date: slot.slot_date,
                    slots: vec![SlotView { time: slot.slot_time, available: slot.is_available }],
                }),
            }
        }

        Ok(days)
    }

    /// Claim a slot and book it as an approved appointment request.
    ///
    /// The claim is a single conditional update: the filter includes
    /// `is_available=is.true`, so of two concurrent bookers exactly one gets
    /// the row back and the other sees an empty result and `SlotUnavailable`.
    /// No read-then-write window exists.
    pub async fn book_slot(
        &self,
        request: BookSlotRequest,
        auth_token: &str,
    ) -> Result<AppointmentRequest, AvailabilityError> {
        info!("Booking slot {} {} for doctor {}", request.date, request.time, request.doctor_medical_id);

        let claimed = self.claim_slot(
            &request.doctor_medical_id,
            request.date,
            &request.time,
            auth_token,
        ).await?;

        let Some(slot) = claimed else {
            return Err(AvailabilityError::SlotUnavailable);
        };

        let create_payload = CreateRequestPayload {
            doctor_medical_id: request.doctor_medical_id.clone(),
            patient_medical_id: request.patient_medical_id.clone(),
            preferred_date: request.date,
            preferred_time: request.time.clone(),
            symptoms: request.symptoms,
            contact_info: request.contact_info,
            notification_type: Default::default(),
            meeting_type: request.meeting_type,
        };

        let booked = match self.create_approved_request(create_payload, auth_token).await {
            Ok(booked) => booked,
            Err(e) => {
                // The claim must not outlive a failed booking; put the slot back.
                self.release_claimed_slot(slot.id, auth_token).await;
                return Err(e);
            }
        };

        self.stamp_booking(slot.id, booked.id, auth_token).await;

        info!("Slot {} booked as request {}", slot.id, booked.id);
        Ok(booked)
    }

    /// Cancel a direct booking: soft-cancel the unified request, then
    /// best-effort release of the slot. A slot that can no longer be found is
    /// skipped, not an error.
    pub async fn cancel_booking(
        &self,
        request_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentRequest, AvailabilityError> {
        info!("Cancelling booking for request {}", request_id);

        let cancelled = self.requests.update_status(
            request_id,
            UpdateStatusPayload {
                status: RequestStatus::Cancelled,
                doctor_response: None,
                scheduled_date: None,
                scheduled_time: None,
            },
            auth_token,
        ).await.map_err(|e| match e {
            RequestError::NotFound => AvailabilityError::BookingNotFound,
            other => AvailabilityError::DatabaseError(other.to_string()),
        })?;

        let release_path = format!(
            "/rest/v1/availability_slots?booked_request_id=eq.{}&is_available=is.false",
            request_id
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let released: Result<Vec<Value>, _> = self.supabase.request_with_headers(
            Method::PATCH,
            &release_path,
            Some(auth_token),
            Some(json!({
                "is_available": true,
                "booked_request_id": null,
                "updated_at": Utc::now().to_rfc3339(),
            })),
            Some(headers),
        ).await;

        match released {
            Ok(rows) if rows.is_empty() => {
                debug!("No claimed slot found for request {}, skipping release", request_id);
            }
            Ok(_) => debug!("Slot released for request {}", request_id),
            Err(e) => warn!("Failed to release slot for request {}: {}", request_id, e),
        }

        Ok(cancelled)
    }

    // The booking flow runs create + approve through the request store so the
    // record carries the same snapshot and side effects as a doctor-approved
    // request, including the confirmation email.
    async fn create_approved_request(
        &self,
        payload: CreateRequestPayload,
        auth_token: &str,
    ) -> Result<AppointmentRequest, AvailabilityError> {
        let scheduled_date = payload.preferred_date;
        let scheduled_time = payload.preferred_time.clone();

        let created = self.requests.create_request(payload, auth_token).await
            .map_err(Self::map_request_error)?;

        self.requests.update_status(
            created.id,
            UpdateStatusPayload {
                status: RequestStatus::Approved,
                doctor_response: None,
                scheduled_date: Some(scheduled_date),
                scheduled_time: Some(scheduled_time),
            },
            auth_token,
        ).await.map_err(Self::map_request_error)
    }

    /// Take an available slot with one conditional update. Returns `None`
    /// when no row matched the filter, i.e. the slot was already claimed or
    /// never existed.
    async fn claim_slot(
        &self,
        doctor_medical_id: &str,
        date: chrono::NaiveDate,
        time: &str,
        auth_token: &str,
    ) -> Result<Option<AvailabilitySlot>, AvailabilityError> {
        let path = format!(
            "/rest/v1/availability_slots?doctor_medical_id=eq.{}&slot_date=eq.{}&slot_time=eq.{}&is_available=is.true",
            urlencoding::encode(doctor_medical_id),
            date.format("%Y-%m-%d"),
            urlencoding::encode(time)
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "is_available": false,
                "updated_at": Utc::now().to_rfc3339(),
            })),
            Some(headers),
        ).await.map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let slot: AvailabilitySlot = serde_json::from_value(row)
                    .map_err(|e| AvailabilityError::DatabaseError(format!("Failed to parse slot: {}", e)))?;
                Ok(Some(slot))
            }
            None => Ok(None),
        }
    }

    async fn release_claimed_slot(&self, slot_id: Uuid, auth_token: &str) {
        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Result<Vec<Value>, _> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "is_available": true,
                "booked_request_id": null,
                "updated_at": Utc::now().to_rfc3339(),
            })),
            Some(headers),
        ).await;

        if let Err(e) = result {
            warn!("Failed to release slot {} after booking failure: {}", slot_id, e);
        }
    }

    async fn stamp_booking(&self, slot_id: Uuid, request_id: Uuid, auth_token: &str) {
        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Result<Vec<Value>, _> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "booked_request_id": request_id,
                "updated_at": Utc::now().to_rfc3339(),
            })),
            Some(headers),
        ).await;

        if let Err(e) = result {
            warn!("Failed to link slot {} to request {}: {}", slot_id, request_id, e);
        }
    }

    fn map_request_error(e: RequestError) -> AvailabilityError {
        match e {
            RequestError::DoctorNotFound => AvailabilityError::DoctorNotFound,
            RequestError::PatientNotFound => AvailabilityError::PatientNotFound,
            RequestError::NotFound => AvailabilityError::BookingNotFound,
            RequestError::ValidationError(msg) => AvailabilityError::ValidationError(msg),
            RequestError::DatabaseError(msg) => AvailabilityError::DatabaseError(msg),
        }
    }
}
