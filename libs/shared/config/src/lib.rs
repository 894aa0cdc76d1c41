use std::env;
use tracing::warn;

pub const DEFAULT_SCHEDULING_API_URL: &str =
    "http://127.0.0.1:8000/api/method/docgenie.utils.api_testing";

pub const DEFAULT_FORM_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub scheduling_api_url: String,
    pub scheduling_api_key: String,
    pub scheduling_api_secret: String,
    pub require_phone_verification: bool,
    pub require_email_verification: bool,
    /// Form sessions untouched for this long are dropped.
    pub form_session_idle_secs: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            scheduling_api_url: env::var("SCHEDULING_API_URL")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULING_API_URL not set, using default");
                    DEFAULT_SCHEDULING_API_URL.to_string()
                }),
            scheduling_api_key: env::var("SCHEDULING_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULING_API_KEY not set, using empty value");
                    String::new()
                }),
            scheduling_api_secret: env::var("SCHEDULING_API_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULING_API_SECRET not set, using empty value");
                    String::new()
                }),
            require_phone_verification: flag_from_env("REQUIRE_PHONE_VERIFICATION", true),
            require_email_verification: flag_from_env("REQUIRE_EMAIL_VERIFICATION", true),
            form_session_idle_secs: env::var("FORM_SESSION_IDLE_SECS")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        warn!("FORM_SESSION_IDLE_SECS is not a number of seconds: {}", raw);
                        None
                    }
                })
                .unwrap_or(DEFAULT_FORM_SESSION_IDLE_SECS),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("PORT is not a valid port number: {}", raw);
                        None
                    }
                })
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing scheduling API credentials");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.scheduling_api_url.is_empty()
            && !self.scheduling_api_key.is_empty()
            && !self.scheduling_api_secret.is_empty()
    }
}

fn flag_from_env(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!("{} has unrecognised value {:?}, using default {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
