use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// When unset, drafts live in the in-process memory medium.
    pub redis_url: Option<String>,
    pub drafts_namespace: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let drafts_namespace =
            std::env::var("DRAFTS_NAMESPACE").unwrap_or_else(|_| "resume".to_string());
        if drafts_namespace.trim().is_empty() {
            anyhow::bail!("DRAFTS_NAMESPACE must not be blank");
        }

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            redis_url: optional_env("REDIS_URL"),
            drafts_namespace,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
