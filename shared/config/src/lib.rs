pub mod feature_toggles;

use feature_toggles::FeatureToggles;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// What a bill fetch does when one linked account cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Any unrecoverable account failure fails the whole call.
    Strict,
    /// Failed accounts contribute no bills; the summary covers the rest.
    Lenient,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Strict => f.write_str("strict"),
            FailurePolicy::Lenient => f.write_str("lenient"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(FailurePolicy::Strict),
            "lenient" => Ok(FailurePolicy::Lenient),
            other => Err(format!("expected strict or lenient, got {}", other)),
        }
    }
}

/// Tunables of the bill-fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub failure_policy: FailurePolicy,
    pub max_concurrency: usize,
    pub cache_ttl: Duration,
    pub refresh_cache_ttl: Duration,
    pub rate_limit: u32,
    pub rate_interval: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub refresh_backoff_base: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Strict,
            max_concurrency: 16,
            cache_ttl: Duration::from_secs(3600),
            refresh_cache_ttl: Duration::from_secs(24 * 3600),
            rate_limit: 100,
            rate_interval: Duration::from_secs(60),
            max_attempts: 3,
            backoff_base: Duration::from_millis(1000),
            refresh_backoff_base: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub db_max_connections: u32,
    pub fetch: FetchConfig,
    pub refresh_interval: Duration,
    pub feature_toggles: FeatureToggles,
}

impl AppConfig {
    /// Load `.env` (if present) and read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.feature_toggles = FeatureToggles::from_env_path();
        Ok(config)
    }

    /// Build the configuration from an arbitrary key lookup. Feature toggles
    /// are left at their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = FetchConfig::default();

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let fetch = FetchConfig {
            failure_policy: parse_or(&get, "BILL_FETCH_FAILURE_POLICY", defaults.failure_policy)?,
            max_concurrency: positive(
                "BILL_FETCH_MAX_CONCURRENCY",
                parse_or(&get, "BILL_FETCH_MAX_CONCURRENCY", defaults.max_concurrency)?,
            )?,
            cache_ttl: secs_or(&get, "BILL_CACHE_TTL_SECS", defaults.cache_ttl)?,
            refresh_cache_ttl: secs_or(&get, "BILL_REFRESH_CACHE_TTL_SECS", defaults.refresh_cache_ttl)?,
            rate_limit: positive(
                "PROVIDER_RATE_LIMIT",
                parse_or(&get, "PROVIDER_RATE_LIMIT", defaults.rate_limit)?,
            )?,
            rate_interval: nonzero_duration(
                "PROVIDER_RATE_INTERVAL_SECS",
                secs_or(&get, "PROVIDER_RATE_INTERVAL_SECS", defaults.rate_interval)?,
            )?,
            max_attempts: positive(
                "PROVIDER_MAX_ATTEMPTS",
                parse_or(&get, "PROVIDER_MAX_ATTEMPTS", defaults.max_attempts)?,
            )?,
            backoff_base: millis_or(&get, "PROVIDER_BACKOFF_BASE_MS", defaults.backoff_base)?,
            refresh_backoff_base: millis_or(&get, "REFRESH_BACKOFF_BASE_MS", defaults.refresh_backoff_base)?,
        };

        Ok(Self {
            port: parse_or(&get, "BILLING_SERVICE_PORT", 3011u16)?,
            database_url,
            redis_url: get("REDIS_URL"),
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10u32)?,
            fetch,
            refresh_interval: nonzero_duration(
                "REFRESH_INTERVAL_SECS",
                secs_or(&get, "REFRESH_INTERVAL_SECS", Duration::from_secs(24 * 3600))?,
            )?,
            feature_toggles: FeatureToggles::default(),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}

fn millis_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default.as_millis() as u64).map(Duration::from_millis)
}

fn positive<T>(key: &'static str, value: T) -> Result<T, ConfigError>
where
    T: Copy + PartialOrd + Default + fmt::Display,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        })
    }
}

fn nonzero_duration(key: &'static str, value: Duration) -> Result<Duration, ConfigError> {
    if value.is_zero() {
        Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        })
    } else {
        Ok(value)
    }
}
