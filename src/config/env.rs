use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Debug, Clone)]
pub struct Config {
    // HTTP listener
    pub port: u16,

    // Bearer token for Gmail API calls, supplied by the OAuth login flow
    pub access_token: Option<String>,

    // Gmail REST base URL (overridable for tests and proxies)
    pub gmail_api_base: String,

    // Logging
    pub debug_logs_enabled: bool,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file from multiple possible locations
        // Priority: 1. Current directory, 2. docker/.env, 3. Parent directory
        if dotenvy::dotenv().is_err() {
            if dotenvy::from_path("docker/.env").is_err() {
                dotenvy::from_path("../.env").ok();
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .map(|s| s.trim().parse::<u16>().context("PORT must be a number between 1-65535"))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let config = Config {
            port,
            access_token: lookup("ACCESS_TOKEN")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            gmail_api_base: lookup("GMAIL_API_BASE")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_GMAIL_API_BASE.to_string()),
            debug_logs_enabled: lookup("DEBUG_LOGS_ENABLED")
                .unwrap_or_else(|| "false".to_string())
                .to_lowercase() == "true",
            log_file: lookup("LOG_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be between 1 and 65535");
        }

        let base = url::Url::parse(&self.gmail_api_base)
            .with_context(|| format!("GMAIL_API_BASE is not a valid URL: {}", self.gmail_api_base))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            anyhow::bail!("GMAIL_API_BASE must use http or https");
        }

        Ok(())
    }
}
