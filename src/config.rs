use std::env;

use crate::constants::{
    DEFAULT_RETENTION_DAYS, DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_SWEEP_STARTUP_DELAY_SECS,
    DEFAULT_WORKER_CONCURRENCY,
};
use crate::merge::NormalizerConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    /// Shared secret required by all /admin endpoints
    pub admin_secret_key: String,
    /// Base URL of the identity provider's admin API
    pub identity_api_url: String,
    /// Service key for the identity provider's admin API
    pub identity_api_key: String,
    /// Days an account stays restorable after a soft delete
    pub retention_days: i64,
    pub sweep_interval_secs: u64,
    pub sweep_startup_delay_secs: u64,
    /// Bounded worker pool size for merge groups and sweep users
    pub worker_concurrency: usize,
    /// Branding noise tokens stripped from the end of tenant names
    pub boilerplate_suffixes: Vec<String>,
    /// Generic business nouns stripped from the end of tenant names
    pub business_suffixes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let admin_secret_key = env::var("ADMIN_SECRET_KEY")
            .map_err(|_| "ADMIN_SECRET_KEY must be set for admin endpoints")?;

        let identity_api_url =
            env::var("IDENTITY_API_URL").map_err(|_| "IDENTITY_API_URL must be set")?;

        let identity_api_key =
            env::var("IDENTITY_API_KEY").map_err(|_| "IDENTITY_API_KEY must be set")?;

        let retention_days = env::var("RETENTION_DAYS")
            .unwrap_or_else(|_| DEFAULT_RETENTION_DAYS.to_string())
            .parse()
            .map_err(|_| "Invalid RETENTION_DAYS")?;

        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid SWEEP_INTERVAL_SECS")?;

        let sweep_startup_delay_secs = env::var("SWEEP_STARTUP_DELAY_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_STARTUP_DELAY_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid SWEEP_STARTUP_DELAY_SECS")?;

        let worker_concurrency = env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| DEFAULT_WORKER_CONCURRENCY.to_string())
            .parse()
            .map_err(|_| "Invalid WORKER_CONCURRENCY")?;

        let boilerplate_suffixes = split_list(
            &env::var("NAME_BOILERPLATE_SUFFIXES").unwrap_or_else(|_| "pos,pos's".to_string()),
        );

        let business_suffixes = split_list(
            &env::var("NAME_BUSINESS_SUFFIXES").unwrap_or_else(|_| "company".to_string()),
        );

        Ok(Config {
            server_host,
            server_port,
            database_url,
            allowed_origins,
            environment,
            admin_secret_key,
            identity_api_url,
            identity_api_key,
            retention_days,
            sweep_interval_secs,
            sweep_startup_delay_secs,
            worker_concurrency,
            boilerplate_suffixes,
            business_suffixes,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Build the name normalizer configuration from the suffix lists
    pub fn normalizer(&self) -> NormalizerConfig {
        NormalizerConfig {
            boilerplate_suffixes: self.boilerplate_suffixes.clone(),
            business_suffixes: self.business_suffixes.clone(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
