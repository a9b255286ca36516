//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use carrierhub_hex::ServiceConfig;
use carrierhub_hex::inbound::RateLimitConfig;
use carrierhub_hex::tokens::parse_ttl;
use carrierhub_repo::security::PASSWORD_HASH_COST;
use razorpay_gateway::{DEFAULT_API_BASE, RazorpayConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub environment: String,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub razorpay: RazorpayConfig,
    /// Smallest bookable amount in paise.
    pub min_booking_amount: i64,
    pub rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow::anyhow!("{key} environment variable is required"))
        };

        let jwt_ttl_raw = var("JWT_EXPIRES_IN").unwrap_or_else(|| "7d".to_string());
        let jwt_ttl = parse_ttl(&jwt_ttl_raw)
            .ok_or_else(|| anyhow::anyhow!("JWT_EXPIRES_IN has an invalid value: {jwt_ttl_raw}"))?;

        let mut razorpay = RazorpayConfig::new(
            var("RAZORPAY_KEY_ID").unwrap_or_default(),
            var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
        )
        .with_api_base(var("RAZORPAY_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()));
        if let Some(secret) = var("RAZORPAY_WEBHOOK_SECRET") {
            razorpay = razorpay.with_webhook_secret(secret);
        }

        let rate_limit = RateLimitConfig {
            window: Duration::from_millis(parse_or(&var, "RATE_LIMIT_WINDOW_MS", 900_000)?),
            max_requests: parse_or(&var, "RATE_LIMIT_MAX_REQUESTS", 100)?,
            auth_max_requests: parse_or(&var, "AUTH_RATE_LIMIT_MAX_REQUESTS", 15)?,
            trust_proxy: parse_or(&var, "TRUST_PROXY", false)?,
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 5000)?,
            database_url: required("DATABASE_URL")?,
            environment: var("APP_ENV").unwrap_or_else(|| "development".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl,
            razorpay,
            min_booking_amount: parse_or(&var, "MIN_BOOKING_AMOUNT", 1000)?,
            rate_limit,
            log_format,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            jwt_secret: self.jwt_secret.clone(),
            jwt_ttl: self.jwt_ttl,
            min_booking_amount: self.min_booking_amount,
            bcrypt_cost: PASSWORD_HASH_COST,
            environment: self.environment.clone(),
        }
    }
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "secret"),
        ])
        .unwrap();

        assert_eq!(config.addr(), "0.0.0.0:5000");
        assert_eq!(config.environment, "development");
        assert_eq!(config.jwt_ttl, chrono::Duration::days(7));
        assert_eq!(config.min_booking_amount, 1000);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.auth_max_requests, 15);
        assert!(!config.rate_limit.trust_proxy);
        assert_eq!(config.razorpay.api_base, DEFAULT_API_BASE);
        assert!(config.razorpay.key_id.is_empty());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_required_values() {
        let err = load(&[("JWT_SECRET", "secret")]).err().unwrap();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "sqlite::memory:"), ("JWT_SECRET", "  ")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/carrierhub"),
            ("JWT_SECRET", "secret"),
            ("PORT", "8080"),
            ("JWT_EXPIRES_IN", "12h"),
            ("RAZORPAY_KEY_ID", "rzp_test_1"),
            ("RAZORPAY_WEBHOOK_SECRET", "whsec"),
            ("RATE_LIMIT_WINDOW_MS", "60000"),
            ("TRUST_PROXY", "true"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_ttl, chrono::Duration::hours(12));
        assert_eq!(config.razorpay.key_id, "rzp_test_1");
        assert_eq!(config.razorpay.webhook_secret.as_deref(), Some("whsec"));
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert!(config.rate_limit.trust_proxy);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_numbers_are_reported() {
        let err = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "secret"),
            ("PORT", "http"),
        ])
        .err()
        .unwrap();
        assert!(err.to_string().contains("PORT"));

        assert!(
            load(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("JWT_SECRET", "secret"),
                ("JWT_EXPIRES_IN", "forever"),
            ])
            .is_err()
        );
    }
}
