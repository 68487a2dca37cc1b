use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{
    AppointmentNotice, NotificationChannel, NotificationOutcome, OutboundNotification,
};
use crate::services::transport::{HttpGatewayTransport, NotificationTransport};

const EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";

/// Best-effort outcome notifications for appointment requests.
///
/// The dispatcher never reports failure to its caller: a state transition
/// that already committed must not be rolled back or re-reported because an
/// email could not be sent. Everything here logs and returns.
pub struct NotificationDispatcher {
    transport: Option<Arc<dyn NotificationTransport>>,
    email_regex: Regex,
}

impl NotificationDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        let transport: Option<Arc<dyn NotificationTransport>> =
            match HttpGatewayTransport::new(config) {
                Ok(t) => Some(Arc::new(t)),
                Err(_) => {
                    debug!("Notification gateway not configured, dispatch disabled");
                    None
                }
            };

        Self::build(transport)
    }

    /// Constructor injection seam for tests and alternative transports.
    pub fn with_transport(transport: Arc<dyn NotificationTransport>) -> Self {
        Self::build(Some(transport))
    }

    fn build(transport: Option<Arc<dyn NotificationTransport>>) -> Self {
        Self {
            transport,
            email_regex: Regex::new(EMAIL_PATTERN).expect("email pattern is valid"),
        }
    }

    /// Fire the patient (and on approval, doctor) emails for a decided
    /// request. Failures are logged at warn and swallowed.
    pub async fn notify(&self, outcome: NotificationOutcome, notice: &AppointmentNotice) {
        let Some(transport) = &self.transport else {
            debug!("Skipping {:?} notification: no transport", outcome);
            return;
        };

        let patient_to = self.resolve_patient_email(notice);

        let patient_message = match outcome {
            NotificationOutcome::Approved => self.compose_patient_approval(notice, &patient_to),
            NotificationOutcome::Rejected => self.compose_patient_rejection(notice, &patient_to),
        };

        self.deliver(transport.as_ref(), &patient_message).await;

        if outcome == NotificationOutcome::Approved && !notice.doctor_email.is_empty() {
            let doctor_message = self.compose_doctor_confirmation(notice);
            self.deliver(transport.as_ref(), &doctor_message).await;
        }
    }

    /// Recipient resolution: `contact_info` carrying an `@` is taken as the
    /// address, preferring an email-shaped substring when the field holds
    /// more than the address itself. Without an `@` the patient email
    /// snapshot is used.
    fn resolve_patient_email(&self, notice: &AppointmentNotice) -> String {
        let contact = notice.contact_info.trim();

        if contact.contains('@') {
            return self
                .email_regex
                .find(contact)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| contact.to_string());
        }

        notice.patient_email.clone()
    }

    fn compose_patient_approval(&self, notice: &AppointmentNotice, to: &str) -> OutboundNotification {
        let when = Self::format_schedule(notice);

        let mut body = format!(
            "Dear {},\n\nYour appointment request with {} has been approved.\nScheduled for: {}.\n",
            notice.patient_name, notice.doctor_name, when
        );
        if let Some(link) = &notice.video_call_link {
            body.push_str(&format!("Join your video consultation: {}\n", link));
        }
        if let Some(response) = &notice.doctor_response {
            body.push_str(&format!("\nMessage from your doctor: {}\n", response));
        }

        OutboundNotification {
            channel: NotificationChannel::Email,
            to: to.to_string(),
            subject: "Your appointment request has been approved".to_string(),
            body,
        }
    }

    fn compose_patient_rejection(&self, notice: &AppointmentNotice, to: &str) -> OutboundNotification {
        let mut body = format!(
            "Dear {},\n\nYour appointment request with {} could not be accommodated.\n",
            notice.patient_name, notice.doctor_name
        );
        if let Some(response) = &notice.doctor_response {
            body.push_str(&format!("\nMessage from the doctor: {}\n", response));
        }
        body.push_str("\nPlease submit a new request for another date or doctor.\n");

        OutboundNotification {
            channel: NotificationChannel::Email,
            to: to.to_string(),
            subject: "Update on your appointment request".to_string(),
            body,
        }
    }

    fn compose_doctor_confirmation(&self, notice: &AppointmentNotice) -> OutboundNotification {
        let when = Self::format_schedule(notice);

        let mut body = format!(
            "Dear {},\n\nYour appointment with {} is confirmed for {}.\n",
            notice.doctor_name, notice.patient_name, when
        );
        if let Some(link) = &notice.video_call_link {
            body.push_str(&format!("Video consultation link: {}\n", link));
        }

        OutboundNotification {
            channel: NotificationChannel::Email,
            to: notice.doctor_email.clone(),
            subject: "Appointment confirmed".to_string(),
            body,
        }
    }

    fn format_schedule(notice: &AppointmentNotice) -> String {
        match (&notice.scheduled_date, &notice.scheduled_time) {
            (Some(date), Some(time)) => format!("{} at {}", date.format("%Y-%m-%d"), time),
            (Some(date), None) => date.format("%Y-%m-%d").to_string(),
            _ => "a date to be confirmed".to_string(),
        }
    }

    async fn deliver(&self, transport: &dyn NotificationTransport, message: &OutboundNotification) {
        match transport.send(message).await {
            Ok(()) => debug!("Notification sent to {}", message.to),
            Err(e) => warn!("Failed to send notification to {}: {}", message.to, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice_with_contact(contact_info: &str) -> AppointmentNotice {
        AppointmentNotice {
            patient_name: "Test Patient".to_string(),
            doctor_name: "Dr. Test".to_string(),
            patient_email: "fallback@example.com".to_string(),
            doctor_email: "doctor@example.com".to_string(),
            contact_info: contact_info.to_string(),
            scheduled_date: None,
            scheduled_time: None,
            video_call_link: None,
            doctor_response: None,
        }
    }

    fn dispatcher() -> NotificationDispatcher {
        NotificationDispatcher::build(None)
    }

    #[test]
    fn lone_address_in_contact_info_wins() {
        let d = dispatcher();
        let resolved = d.resolve_patient_email(&notice_with_contact("pat1@example.com"));
        assert_eq!(resolved, "pat1@example.com");
    }

    #[test]
    fn embedded_address_is_extracted() {
        let d = dispatcher();
        let resolved = d.resolve_patient_email(&notice_with_contact(
            "call me after 5pm, or mail pat1@example.com please",
        ));
        assert_eq!(resolved, "pat1@example.com");
    }

    #[test]
    fn falls_back_to_patient_email_snapshot() {
        let d = dispatcher();
        let resolved = d.resolve_patient_email(&notice_with_contact("0851234567"));
        assert_eq!(resolved, "fallback@example.com");
    }

    #[test]
    fn contact_with_at_sign_is_used_as_given() {
        // Best-effort: an @ means the field is treated as the address even
        // when no well-formed email can be extracted from it.
        let d = dispatcher();
        let resolved = d.resolve_patient_email(&notice_with_contact("ring me @ home"));
        assert_eq!(resolved, "ring me @ home");
    }

    #[test]
    fn approval_body_includes_link_when_present() {
        let d = dispatcher();
        let mut notice = notice_with_contact("pat1@example.com");
        notice.scheduled_date = chrono::NaiveDate::from_ymd_opt(2025, 6, 2);
        notice.scheduled_time = Some("11:00".to_string());
        notice.video_call_link = Some("https://meet.jit.si/CareConnectRoom".to_string());

        let message = d.compose_patient_approval(&notice, "pat1@example.com");
        assert!(message.body.contains("2025-06-02 at 11:00"));
        assert!(message.body.contains("https://meet.jit.si/CareConnectRoom"));
    }

    #[test]
    fn rejection_body_carries_doctor_response() {
        let d = dispatcher();
        let mut notice = notice_with_contact("pat1@example.com");
        notice.doctor_response = Some("not available".to_string());

        let message = d.compose_patient_rejection(&notice, "pat1@example.com");
        assert!(message.body.contains("not available"));
        assert!(message.subject.contains("appointment request"));
    }
}
