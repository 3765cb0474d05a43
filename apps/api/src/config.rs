use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gateway_url: String,
    pub gateway_api_key: String,
    /// Optional. Without it dense retrieval is disabled and the pipeline
    /// runs on sparse evidence only.
    pub openai_api_key: Option<String>,
    /// "core" or "extended"; selects the interview field profile.
    pub interview_profile: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gateway_url: require_env("GATEWAY_URL")?,
            gateway_api_key: require_env("GATEWAY_API_KEY")?,
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            interview_profile: std::env::var("INTERVIEW_PROFILE")
                .unwrap_or_else(|_| "extended".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
