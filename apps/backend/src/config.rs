//! Environment-driven configuration.
//!
//! Secrets are only ever read from the environment (or a `.env` file loaded
//! by `dotenvy`); nothing here has a literal credential default.

use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Object-store settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Prepended to every bucket kind, e.g. `lms-` gives `lms-videos`.
    pub bucket_prefix: String,
    /// Use "auto" for Cloudflare R2
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

/// Token lifetime bounds (one hour to one year).
const JWT_EXPIRY_HOURS_RANGE: RangeInclusive<i64> = 1..=8760;
/// Upload limit bounds in MiB.
const MAX_UPLOAD_MB_RANGE: RangeInclusive<usize> = 1..=10 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub grade_policy: String,
    /// Registration as instructor is disabled when unset.
    pub instructor_signup_code: Option<String>,
    pub max_upload_bytes: usize,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let max_upload_mb = parse_in_range(&lookup, "MAX_UPLOAD_MB", 100, MAX_UPLOAD_MB_RANGE)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Invalid {
                key: "MAX_UPLOAD_MB",
                message: format!("{} MiB does not fit in memory size", max_upload_mb),
            })?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_hours: parse_in_range(&lookup, "JWT_EXPIRY_HOURS", 24, JWT_EXPIRY_HOURS_RANGE)?,
            grade_policy: lookup("GRADE_POLICY").unwrap_or_else(|| "engagement".to_string()),
            instructor_signup_code: lookup("INSTRUCTOR_SIGNUP_CODE").filter(|v| !v.is_empty()),
            max_upload_bytes,
            storage: StorageConfig {
                bucket_prefix: lookup("S3_BUCKET_PREFIX").unwrap_or_default(),
                region: lookup("S3_REGION").unwrap_or_else(|| "auto".to_string()),
                endpoint: lookup("S3_ENDPOINT").filter(|v| !v.is_empty()),
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_in_range<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Display,
    T::Err: Display,
{
    let value = parse_or(lookup, key, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            message: format!("{} is outside {}..={}", value, range.start(), range.end()),
        });
    }
    Ok(value)
}
