use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_READ_RETRIES: u32 = 2;
pub const DEFAULT_UPCOMING_POLL_SECS: u64 = 60;
/// Lifetime of the session cookies when the patient asks to be remembered.
pub const REMEMBER_ME_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub api_url: String,
    pub cookie_secret: String,
    pub http_timeout_secs: u64,
    pub read_retries: u32,
    pub upcoming_poll_secs: u64,
    pub cookie_path: Option<PathBuf>,
    pub secure_cookies: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            cookie_secret: String::new(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            read_retries: DEFAULT_READ_RETRIES,
            upcoming_poll_secs: DEFAULT_UPCOMING_POLL_SECS,
            cookie_path: None,
            secure_cookies: true,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_url: env::var("PORTAL_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("PORTAL_API_URL not set, using empty value");
                    String::new()
                }),
            cookie_secret: env::var("PORTAL_COOKIE_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_COOKIE_SECRET not set, using empty value");
                    String::new()
                }),
            http_timeout_secs: parse_var("PORTAL_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            read_retries: parse_var("PORTAL_READ_RETRIES", DEFAULT_READ_RETRIES),
            upcoming_poll_secs: parse_var("PORTAL_UPCOMING_POLL_SECS", DEFAULT_UPCOMING_POLL_SECS),
            cookie_path: env::var("PORTAL_COOKIE_PATH").ok().map(PathBuf::from),
            secure_cookies: parse_var("PORTAL_SECURE_COOKIES", true),
        };

        if !config.is_configured() {
            warn!("Portal not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.cookie_secret.is_empty()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn upcoming_poll_interval(&self) -> Duration {
        Duration::from_secs(self.upcoming_poll_secs)
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
