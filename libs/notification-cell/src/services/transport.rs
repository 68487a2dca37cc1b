use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{NotifyError, OutboundNotification};

/// Outbound delivery seam. Production posts to the configured gateway;
/// tests substitute their own implementation.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, notification: &OutboundNotification) -> Result<(), NotifyError>;
}

/// Delivery via an HTTP gateway that accepts
/// `{type, to, subject, text}` and relays to the mail/SMS provider.
pub struct HttpGatewayTransport {
    client: Client,
    gateway_url: String,
}

impl HttpGatewayTransport {
    pub fn new(config: &AppConfig) -> Result<Self, NotifyError> {
        if !config.is_notifications_configured() {
            return Err(NotifyError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            gateway_url: config.notification_gateway_url.clone(),
        })
    }
}

#[async_trait]
impl NotificationTransport for HttpGatewayTransport {
    async fn send(&self, notification: &OutboundNotification) -> Result<(), NotifyError> {
        debug!("Sending {} notification to {}", notification.channel, notification.to);

        let body = json!({
            "type": notification.channel.to_string(),
            "to": notification.to,
            "subject": notification.subject,
            "text": notification.body,
        });

        let response = self
            .client
            .post(&self.gateway_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Transport(format!("HTTP {}: {}", status, response_text)));
        }

        Ok(())
    }
}
