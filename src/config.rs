use dotenvy::dotenv;
use std::env;

use crate::conflict::ConflictPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Recipient of "new request" notifications.
    pub manager_email: String,
    /// SMTP relay credentials; when absent, outgoing mail is logged instead.
    pub smtp_relay: String,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,

    /// Key for the generative schedule summary; endpoint is disabled
    /// without it.
    pub gemini_api_key: Option<String>,

    /// Comma-separated department names excused from conflict checks.
    pub exempt_departments: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env::var("ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| "900".to_string()) // default 15 min
                .parse()
                .unwrap(),
            refresh_token_ttl: env::var("REFRESH_TOKEN_TTL")
                .unwrap_or_else(|_| "604800".to_string()) // default 7 days
                .parse()
                .unwrap(),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_refresh_per_min: env::var("RATE_REFRESH_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            manager_email: env::var("MANAGER_EMAIL")
                .unwrap_or_else(|_| "manager@azienda.it".to_string()),
            smtp_relay: env::var("SMTP_RELAY").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_pass: env::var("SMTP_PASS").ok(),

            gemini_api_key: env::var("GEMINI_API_KEY").ok(),

            exempt_departments: env::var("EXEMPT_DEPARTMENTS")
                .unwrap_or_else(|_| "MANAGEMENT".to_string()),
        }
    }

    /// The shared exemption policy every conflict call site uses.
    pub fn conflict_policy(&self) -> ConflictPolicy {
        ConflictPolicy::from_names(
            self.exempt_departments
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }
}
