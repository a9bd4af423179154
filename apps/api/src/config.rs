use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub upload_dir: String,
    /// Allowed CORS origin. Permissive when unset.
    pub frontend_url: Option<String>,
    pub ai_requests_per_minute: u32,
    pub ai_burst: u32,
    pub batch_pacing: Duration,
    /// Requests per client IP per window across `/api/`.
    pub api_rate_limit: u32,
    /// Requests per client IP per window on the optimize endpoints.
    pub optimize_rate_limit: u32,
    pub rate_limit_window: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            port: parse_env("PORT", 4000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            frontend_url: std::env::var("FRONTEND_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            ai_requests_per_minute: parse_env("AI_REQUESTS_PER_MINUTE", 15)?,
            ai_burst: parse_env("AI_BURST", 5)?,
            batch_pacing: Duration::from_millis(parse_env("BATCH_PACING_MS", 2000)?),
            api_rate_limit: parse_env("API_RATE_LIMIT", 100)?,
            optimize_rate_limit: parse_env("OPTIMIZE_RATE_LIMIT", 20)?,
            rate_limit_window: Duration::from_secs(parse_env("RATE_LIMIT_WINDOW_SECS", 15 * 60)?),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests(upload_dir: &std::path::Path) -> Self {
        Config {
            database_url: "postgres://localhost/unused".to_string(),
            gemini_api_key: "test-key".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            frontend_url: None,
            ai_requests_per_minute: 60,
            ai_burst: 5,
            batch_pacing: Duration::from_secs(2),
            api_rate_limit: 100,
            optimize_rate_limit: 20,
            rate_limit_window: Duration::from_secs(15 * 60),
        }
    }
}
