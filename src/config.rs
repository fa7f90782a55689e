//! Gateway configuration
//!
//! Read from environment variables (a `.env` file is loaded first when present).

use crate::error::{AppError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://sandbox.belvo.com/api";
const DEFAULT_DATABASE_URL: &str = "sqlite://gateway.db";

/// Largest `page_size` the aggregator accepts on list endpoints
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Aggregator connection settings
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub base_url: url::Url,
    pub client_id: String,
    pub secret: String,
    pub timeout: Duration,
    pub transactions_page_size: u32,
    pub institutions_page_size: u32,
}

/// Full gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub access_token_expire_minutes: i64,
    pub aggregator: AggregatorConfig,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
        };

        let raw_base = lookup("BELVO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        // Endpoint paths are joined relative to the base, which needs a trailing slash
        let base_url = url::Url::parse(&format!("{}/", raw_base.trim_end_matches('/')))
            .map_err(|e| AppError::Config(format!("Invalid BELVO_BASE_URL: {}", e)))?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let database_path = PathBuf::from(
            database_url
                .strip_prefix("sqlite://")
                .unwrap_or(&database_url),
        );

        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let access_token_expire_minutes = parse_or(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 60)?;
        if access_token_expire_minutes <= 0
            || session_expiry(chrono::Utc::now(), access_token_expire_minutes).is_none()
        {
            return Err(AppError::Config(format!(
                "Invalid ACCESS_TOKEN_EXPIRE_MINUTES: {}",
                access_token_expire_minutes
            )));
        }

        Ok(Self {
            database_path,
            data_dir,
            host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", 8000)?,
            access_token_expire_minutes,
            aggregator: AggregatorConfig {
                base_url,
                client_id: required("BELVO_CLIENT_ID")?,
                secret: required("BELVO_SECRET")?,
                timeout: Duration::from_secs(parse_or(&lookup, "AGGREGATOR_TIMEOUT_SECS", 15)?),
                transactions_page_size: page_size(&lookup, "TRANSACTIONS_PAGE_SIZE", 1000)?,
                institutions_page_size: page_size(&lookup, "INSTITUTIONS_PAGE_SIZE", 50)?,
            },
        })
    }

    /// Socket address the API server binds to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address: {}", e)))
    }
}

/// Expiry instant of a session opened at `now`, `None` when out of range
pub fn session_expiry(
    now: chrono::DateTime<chrono::Utc>,
    minutes: i64,
) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::TimeDelta::try_minutes(minutes).and_then(|ttl| now.checked_add_signed(ttl))
}

fn page_size<F>(lookup: &F, key: &str, default: u32) -> Result<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let size = parse_or(lookup, key, default)?;
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(AppError::Config(format!(
            "{} must be between 1 and {}, got {}",
            key, MAX_PAGE_SIZE, size
        )));
    }
    Ok(size)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
