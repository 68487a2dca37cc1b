// libs/appointment-request-cell/src/services/requests.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use directory_cell::models::{DirectoryError, UserRole};
use directory_cell::services::directory::DirectoryService;
use notification_cell::models::{AppointmentNotice, NotificationOutcome};
use notification_cell::services::dispatcher::NotificationDispatcher;

use crate::models::{
    AppointmentRequest, AddMessagePayload, ConversationMessage, CreateRequestPayload,
    MeetingType, RequestError, RequestStats, RequestStatus, UpdateStatusPayload,
};
use crate::services::meeting_link;

pub struct AppointmentRequestService {
    supabase: SupabaseClient,
    directory: DirectoryService,
    dispatcher: NotificationDispatcher,
    meeting_link_base_url: String,
}

impl AppointmentRequestService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_dispatcher(config, NotificationDispatcher::new(config))
    }

    /// Constructor injection for the notification side effect; tests pass a
    /// dispatcher wired to a mock transport.
    pub fn with_dispatcher(config: &AppConfig, dispatcher: NotificationDispatcher) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
            dispatcher,
            meeting_link_base_url: config.meeting_link_base_url.clone(),
        }
    }

    /// Create a new request in `pending` status. Both parties must resolve in
    /// the directory with matching roles; their names and emails are copied
    /// onto the record at this instant and never re-synced.
    pub async fn create_request(
        &self,
        payload: CreateRequestPayload,
        auth_token: &str,
    ) -> Result<AppointmentRequest, RequestError> {
        info!("Creating appointment request: patient {} -> doctor {}",
              payload.patient_medical_id, payload.doctor_medical_id);

        self.validate_create_payload(&payload)?;

        let doctor = self.directory
            .find_by_medical_id(&payload.doctor_medical_id, Some(UserRole::Doctor), auth_token)
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound => RequestError::DoctorNotFound,
                other => RequestError::DatabaseError(other.to_string()),
            })?;

        let patient = self.directory
            .find_by_medical_id(&payload.patient_medical_id, Some(UserRole::Patient), auth_token)
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound => RequestError::PatientNotFound,
                other => RequestError::DatabaseError(other.to_string()),
            })?;

        let now = Utc::now();
        let request_data = json!({
            "doctor_medical_id": doctor.medical_id,
            "patient_medical_id": patient.medical_id,
            "doctor_name": doctor.username,
            "patient_name": patient.username,
            "doctor_email": doctor.email,
            "patient_email": patient.email,
            "preferred_date": payload.preferred_date.format("%Y-%m-%d").to_string(),
            "preferred_time": payload.preferred_time,
            "meeting_type": payload.meeting_type.to_string(),
            "notification_type": payload.notification_type.to_string(),
            "status": RequestStatus::Pending.to_string(),
            "symptoms": payload.symptoms,
            "contact_info": payload.contact_info,
            "conversation": [],
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointment_requests",
            Some(auth_token),
            Some(request_data),
            Some(headers),
        ).await.map_err(|e| RequestError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(RequestError::DatabaseError("Failed to create appointment request".to_string()));
        }

        let request: AppointmentRequest = serde_json::from_value(result[0].clone())
            .map_err(|e| RequestError::DatabaseError(format!("Failed to parse created request: {}", e)))?;

        info!("Appointment request {} created in pending status", request.id);
        Ok(request)
    }

    /// Doctor-facing listing: pending and approved requests, newest first.
    /// Rejected and cancelled entries are deliberately excluded; history views
    /// are a separate path.
    pub async fn list_for_doctor(
        &self,
        doctor_medical_id: &str,
        auth_token: &str,
    ) -> Result<Vec<AppointmentRequest>, RequestError> {
        debug!("Listing requests for doctor: {}", doctor_medical_id);

        let path = format!(
            "/rest/v1/appointment_requests?doctor_medical_id=eq.{}&status=in.(pending,approved)&order=created_at.desc",
            urlencoding::encode(doctor_medical_id)
        );

        self.fetch_requests(&path, auth_token).await
    }

    /// Patient-facing listing: pending and approved requests with a preferred
    /// date of today or later, soonest first. The asymmetry with the doctor
    /// listing is intentional; client views sub-filter by status on top.
    pub async fn list_for_patient(
        &self,
        patient_medical_id: &str,
        auth_token: &str,
    ) -> Result<Vec<AppointmentRequest>, RequestError> {
        debug!("Listing requests for patient: {}", patient_medical_id);

        let today = Utc::now().date_naive();
        let path = format!(
            "/rest/v1/appointment_requests?patient_medical_id=eq.{}&status=in.(pending,approved)&preferred_date=gte.{}&order=preferred_date.asc",
            urlencoding::encode(patient_medical_id),
            today.format("%Y-%m-%d")
        );

        self.fetch_requests(&path, auth_token).await
    }

    pub async fn get_request(
        &self,
        request_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentRequest, RequestError> {
        debug!("Fetching appointment request: {}", request_id);

        let path = format!("/rest/v1/appointment_requests?id=eq.{}", request_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| RequestError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(RequestError::NotFound);
        }

        let request: AppointmentRequest = serde_json::from_value(result[0].clone())
            .map_err(|e| RequestError::DatabaseError(format!("Failed to parse request: {}", e)))?;

        Ok(request)
    }

    /// Transition a request to a new status.
    ///
    /// The status is overwritten unconditionally; the machine stays
    /// permissive on purpose (see DESIGN.md). Schedule fields persist only on
    /// approval, and the video link is derived only for approved online
    /// meetings with a complete schedule. Outcome notifications fire after the
    /// write commits and can never fail the transition.
    pub async fn update_status(
        &self,
        request_id: Uuid,
        payload: UpdateStatusPayload,
        auth_token: &str,
    ) -> Result<AppointmentRequest, RequestError> {
        info!("Updating request {} to status {}", request_id, payload.status);

        let current = self.get_request(request_id, auth_token).await?;

        let now = Utc::now();
        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(payload.status.to_string()));

        if let Some(message) = &payload.doctor_response {
            update_data.insert("doctor_response".to_string(), json!({
                "message": message,
                "responded_at": now.to_rfc3339(),
            }));
        }

        if payload.status == RequestStatus::Approved {
            if let (Some(date), Some(time)) = (payload.scheduled_date, payload.scheduled_time.as_deref()) {
                update_data.insert("scheduled_date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
                update_data.insert("scheduled_time".to_string(), json!(time));

                if current.meeting_type == MeetingType::Online {
                    let link = meeting_link::generate(
                        &self.meeting_link_base_url,
                        &current.patient_name,
                        &current.doctor_name,
                        date,
                        time,
                    );
                    update_data.insert("video_call_link".to_string(), json!(link));
                }
            }
        }

        update_data.insert("updated_at".to_string(), json!(now.to_rfc3339()));

        let path = format!("/rest/v1/appointment_requests?id=eq.{}", request_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| RequestError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(RequestError::NotFound);
        }

        let updated: AppointmentRequest = serde_json::from_value(result[0].clone())
            .map_err(|e| RequestError::DatabaseError(format!("Failed to parse updated request: {}", e)))?;

        // Post-commit, best-effort: the transition already succeeded and is
        // reported as such whatever happens to the emails.
        match updated.status {
            RequestStatus::Approved => {
                self.dispatcher.notify(NotificationOutcome::Approved, &Self::notice(&updated)).await;
            }
            RequestStatus::Rejected => {
                self.dispatcher.notify(NotificationOutcome::Rejected, &Self::notice(&updated)).await;
            }
            _ => {}
        }

        info!("Request {} is now {}", updated.id, updated.status);
        Ok(updated)
    }

    /// Append one message to the request's conversation thread. The sender's
    /// display name comes from the directory at send time.
    pub async fn add_message(
        &self,
        request_id: Uuid,
        sender_medical_id: &str,
        payload: AddMessagePayload,
        auth_token: &str,
    ) -> Result<AppointmentRequest, RequestError> {
        debug!("Appending message to request {} from {}", request_id, sender_medical_id);

        if payload.message.trim().is_empty() {
            return Err(RequestError::ValidationError("message is required".to_string()));
        }

        let current = self.get_request(request_id, auth_token).await?;

        let sender = self.directory
            .find_by_medical_id(sender_medical_id, None, auth_token)
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound => {
                    RequestError::ValidationError(format!("Unknown sender: {}", sender_medical_id))
                }
                other => RequestError::DatabaseError(other.to_string()),
            })?;

        let now = Utc::now();
        let mut conversation = current.conversation.clone();
        conversation.push(ConversationMessage {
            sender: sender.medical_id,
            sender_name: sender.username,
            message: payload.message,
            timestamp: now,
        });

        let update_data = json!({
            "conversation": conversation,
            "updated_at": now.to_rfc3339(),
        });

        let path = format!("/rest/v1/appointment_requests?id=eq.{}", request_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| RequestError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(RequestError::NotFound);
        }

        let updated: AppointmentRequest = serde_json::from_value(result[0].clone())
            .map_err(|e| RequestError::DatabaseError(format!("Failed to parse updated request: {}", e)))?;

        Ok(updated)
    }

    /// Counts per status and meeting type over the whole collection, for the
    /// admin dashboard.
    pub async fn request_stats(&self, auth_token: &str) -> Result<RequestStats, RequestError> {
        debug!("Calculating appointment request statistics");

        let path = "/rest/v1/appointment_requests?select=status,meeting_type";
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| RequestError::DatabaseError(e.to_string()))?;

        let mut stats = RequestStats {
            total_requests: rows.len() as i32,
            pending_requests: 0,
            approved_requests: 0,
            rejected_requests: 0,
            cancelled_requests: 0,
            online_meetings: 0,
            offline_meetings: 0,
        };

        for row in &rows {
            match row["status"].as_str() {
                Some("pending") => stats.pending_requests += 1,
                Some("approved") => stats.approved_requests += 1,
                Some("rejected") => stats.rejected_requests += 1,
                Some("cancelled") => stats.cancelled_requests += 1,
                _ => {}
            }
            match row["meeting_type"].as_str() {
                Some("online") => stats.online_meetings += 1,
                Some("offline") => stats.offline_meetings += 1,
                _ => {}
            }
        }

        Ok(stats)
    }

    fn validate_create_payload(&self, payload: &CreateRequestPayload) -> Result<(), RequestError> {
        if payload.doctor_medical_id.trim().is_empty() {
            return Err(RequestError::ValidationError("doctor_medical_id is required".to_string()));
        }
        if payload.patient_medical_id.trim().is_empty() {
            return Err(RequestError::ValidationError("patient_medical_id is required".to_string()));
        }
        if payload.preferred_time.trim().is_empty() {
            return Err(RequestError::ValidationError("preferred_time is required".to_string()));
        }
        if payload.symptoms.trim().is_empty() {
            return Err(RequestError::ValidationError("symptoms is required".to_string()));
        }
        if payload.contact_info.trim().is_empty() {
            return Err(RequestError::ValidationError("contact_info is required".to_string()));
        }
        Ok(())
    }

    async fn fetch_requests(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<AppointmentRequest>, RequestError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| RequestError::DatabaseError(e.to_string()))?;

        let requests: Vec<AppointmentRequest> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AppointmentRequest>, _>>()
            .map_err(|e| RequestError::DatabaseError(format!("Failed to parse requests: {}", e)))?;

        Ok(requests)
    }

    fn notice(request: &AppointmentRequest) -> AppointmentNotice {
        AppointmentNotice {
            patient_name: request.patient_name.clone(),
            doctor_name: request.doctor_name.clone(),
            patient_email: request.patient_email.clone(),
            doctor_email: request.doctor_email.clone(),
            contact_info: request.contact_info.clone(),
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time.clone(),
            video_call_link: request.video_call_link.clone(),
            doctor_response: request.doctor_response.as_ref().map(|r| r.message.clone()),
        }
    }
}
