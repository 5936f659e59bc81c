// src/config.rs
use std::env;

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Secret mixed into session token hashes.
    pub session_secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,
    /// RapidAPI key shared by the city/weather/attraction upstreams.
    pub rapid_api_key: String,
    /// SQLite database path.
    pub db_path: String,
    /// Origin allowed to call us from a browser.
    pub allowed_origin: String,
    /// Production mode switches the session cookie to Secure + SameSite=None.
    pub production: bool,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Self {
            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "dev-session-secret".to_string()),
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 60 * 24 * 7), // 7 days
            rapid_api_key: env::var("RAPID_API_KEY").unwrap_or_default(),
            db_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "city_scout.sqlite3".to_string()),
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            production,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string()),
        }
    }
}
