use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub meeting_link_base_url: String,
    pub notification_gateway_url: String,
    pub notifications_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            meeting_link_base_url: env::var("MEETING_LINK_BASE_URL")
                .unwrap_or_else(|_| "https://meet.jit.si".to_string()),
            notification_gateway_url: env::var("NOTIFICATION_GATEWAY_URL")
                .unwrap_or_else(|_| {
                    warn!("NOTIFICATION_GATEWAY_URL not set, outbound notifications will be skipped");
                    String::new()
                }),
            notifications_enabled: env::var("NOTIFICATIONS_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_notifications_configured(&self) -> bool {
        self.notifications_enabled && !self.notification_gateway_url.is_empty()
    }
}
