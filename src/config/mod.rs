use std::env;
use anyhow::{Result, Context};
use tracing::{info, warn};

/// Default endpoint of the remote extraction model. Overridable so tests
/// and self-hosted gateways can point the caller elsewhere.
const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub max_concurrent_requests: usize,
    pub request_timeout_seconds: u64,
    pub gemini_url: String,
    pub gemini_api_key: String,
    pub gemini_timeout_seconds: u64,
    pub gemini_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| {
                info!("SERVER_HOST not set, using default: 0.0.0.0");
                "0.0.0.0".to_string()
            }),
            server_port: Self::parse_env_var("SERVER_PORT", 8000)
                .context("Failed to parse SERVER_PORT")?,
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", 10)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            max_concurrent_requests: Self::parse_env_var("MAX_CONCURRENT_REQUESTS", 100)
                .context("Failed to parse MAX_CONCURRENT_REQUESTS")?,
            request_timeout_seconds: Self::parse_env_var("REQUEST_TIMEOUT_SECONDS", 120)
                .context("Failed to parse REQUEST_TIMEOUT_SECONDS")?,
            gemini_url: env::var("GEMINI_URL").unwrap_or_else(|_| {
                info!("GEMINI_URL not set, using default endpoint");
                DEFAULT_GEMINI_URL.to_string()
            }),
            gemini_api_key: env::var("GEMINI_API_KEY")
                .context("GEMINI_API_KEY must be set; the service refuses to start without it")?,
            gemini_timeout_seconds: Self::parse_env_var("GEMINI_TIMEOUT_SECONDS", 60)
                .context("Failed to parse GEMINI_TIMEOUT_SECONDS")?,
            gemini_max_retries: Self::parse_env_var("GEMINI_MAX_RETRIES", 3)
                .context("Failed to parse GEMINI_MAX_RETRIES")?,
        };

        // Validate configuration values
        config.validate()?;

        info!(
            "Configuration loaded successfully: host={} port={} max_file_size_mb={} max_retries={}",
            config.server_host,
            config.server_port,
            config.max_file_size_mb,
            config.gemini_max_retries
        );
        Ok(config)
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_REQUESTS must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECONDS must be greater than 0"));
        }
        if self.gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY must not be empty"));
        }
        if self.gemini_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("GEMINI_TIMEOUT_SECONDS must be greater than 0"));
        }
        if self.gemini_max_retries == 0 {
            return Err(anyhow::anyhow!("GEMINI_MAX_RETRIES must be greater than 0"));
        }
        Ok(())
    }
}
