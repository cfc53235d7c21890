//! Configuration resolution from the process environment.

use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{
    Environment, GatewayConfig, DEV_SECRET_PLACEHOLDER,
};

/// Error type for configuration resolution. Fatal: the process must not
/// start with a half-parsed configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("JWT_SECRET_KEY must be set to a non-default value in production")]
    MissingSecret,
}

/// Resolve the configuration snapshot from the process environment.
pub fn from_env() -> Result<GatewayConfig, ConfigError> {
    resolve(|key| std::env::var(key).ok())
}

/// Resolve a snapshot from an arbitrary key lookup. Every key falls back
/// to its schema default when absent; a present but unparseable value is
/// an error naming the key.
pub fn resolve<F>(get: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = GatewayConfig::default();

    config.environment = match get("GATEWAY_ENV") {
        None => Environment::default(),
        Some(raw) => {
            Environment::from_str(&raw).map_err(|_| ConfigError::Invalid {
                key: "GATEWAY_ENV",
                value: raw,
                expected: "one of development, production, testing",
            })?
        }
    };

    config.server.host = get("HOST").unwrap_or(config.server.host);
    config.server.port = parse_int(&get, "PORT", config.server.port)?;
    config.server.reload = parse_bool(&get, "RELOAD", config.server.reload)?;
    config.server.request_timeout_secs = parse_int(
        &get,
        "REQUEST_TIMEOUT_SECS",
        config.server.request_timeout_secs,
    )?;

    config.auth.secret = get("JWT_SECRET_KEY").unwrap_or(config.auth.secret);
    config.auth.token_ttl_minutes =
        parse_int(&get, "TOKEN_EXPIRE_MINUTES", config.auth.token_ttl_minutes)?;
    // The bypass flag is folded into an explicit boolean here so the
    // validator never has to reason about deployment modes.
    let disable_auth = parse_bool(&get, "DISABLE_AUTH", false)?;
    config.auth.enabled = config.environment.is_production() || !disable_auth;

    if config.environment.is_production()
        && (config.auth.secret.is_empty() || config.auth.secret == DEV_SECRET_PLACEHOLDER)
    {
        return Err(ConfigError::MissingSecret);
    }

    config.rate_limit.enabled =
        parse_bool(&get, "RATE_LIMIT_ENABLED", config.rate_limit.enabled)?;
    config.rate_limit.max_requests =
        parse_int(&get, "RATE_LIMIT_REQUESTS", config.rate_limit.max_requests)?;
    config.rate_limit.window_secs =
        parse_int(&get, "RATE_LIMIT_PERIOD", config.rate_limit.window_secs)?;
    config.rate_limit.max_clients =
        parse_int(&get, "RATE_LIMIT_MAX_CLIENTS", config.rate_limit.max_clients)?;

    config.cache.enabled = parse_bool(&get, "CACHE_ENABLED", config.cache.enabled)?;
    config.cache.ttl_secs = parse_int(&get, "CACHE_TTL", config.cache.ttl_secs)?;
    config.cache.max_entries = parse_int(&get, "CACHE_MAX_ENTRIES", config.cache.max_entries)?;

    // MAX_REQUEST_SIZE is given in megabytes.
    let max_request_mb: usize = parse_int(&get, "MAX_REQUEST_SIZE", 10)?;
    config.security.max_request_size = max_request_mb * 1024 * 1024;
    if let Some(raw) = get("CORS_ORIGINS") {
        config.security.cors_origins = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    config.observability.log_level = get("LOG_LEVEL")
        .unwrap_or_else(|| config.environment.default_log_level().to_string());
    config.observability.logs_dir = get("LOGS_DIR");
    config.observability.metrics_enabled =
        parse_bool(&get, "METRICS_ENABLED", config.observability.metrics_enabled)?;
    config.observability.metrics_address =
        get("METRICS_ADDRESS").unwrap_or(config.observability.metrics_address);

    config.meta.app_id = get("META_APP_ID").unwrap_or_default();
    config.meta.app_secret = get("META_APP_SECRET").unwrap_or_default();
    config.meta.access_token = get("META_ACCESS_TOKEN").unwrap_or_default();
    config.meta.account_id = get("META_ACCOUNT_ID").unwrap_or_default();

    Ok(config)
}

fn parse_int<F, T>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            expected: "an integer",
        }),
    }
}

fn parse_bool<F>(get: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: raw,
                expected: "a boolean (true/false)",
            }),
        },
    }
}
