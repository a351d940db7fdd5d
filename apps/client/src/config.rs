use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the platform backend, e.g. `http://localhost:5000`.
    pub api_url: String,
    /// Gemini key for resume analysis. Only the analyze command needs it.
    pub gemini_api_key: Option<String>,
    /// Where the session file lives. `None` keeps the session in memory.
    pub session_file: Option<PathBuf>,
    /// Fixed request timeout applied to every outbound call. There is no
    /// automatic retry anywhere in the client.
    pub http_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_url: require_env("SYNQ_API_URL")?,
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            session_file: std::env::var("SYNQ_SESSION_FILE").ok().map(PathBuf::from),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("HTTP_TIMEOUT_SECS must be a number of seconds")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
