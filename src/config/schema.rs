//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits so a snapshot can be serialized for
//! diagnostics; values are resolved from the environment by the loader.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration for the gateway.
///
/// Built once at startup, shared as an immutable snapshot. A reload
/// replaces the whole snapshot; nothing mutates it in place.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server bind and runtime settings.
    pub server: ServerConfig,

    /// Deployment environment. Affects default log level and whether the
    /// auth bypass flag is honored — never rate or cache behavior.
    pub environment: Environment,

    /// Token authentication settings.
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Response cache configuration.
    pub cache: CacheConfig,

    /// Request size and CORS policy.
    pub security: SecurityConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Meta Ads API credentials for the upstream connector.
    pub meta: MetaApiConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Default log level when LOG_LEVEL is not set.
    pub fn default_log_level(self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Production | Environment::Testing => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "testing" => Ok(Environment::Testing),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Testing => "testing",
        };
        f.write_str(name)
    }
}

/// Server bind and runtime settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Honor SIGHUP as a request to re-resolve the environment into a
    /// fresh configuration snapshot.
    pub reload: bool,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Bind address in "host:port" form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            reload: false,
            request_timeout_secs: 30,
        }
    }
}

/// Token authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enforce bearer token validation. Resolved by the loader from the
    /// DISABLE_AUTH flag and the environment: the bypass is never honored
    /// in production.
    pub enabled: bool,

    /// HMAC secret for signing and verifying tokens.
    pub secret: String,

    /// Token lifetime in minutes, applied at issue time.
    pub token_ttl_minutes: u64,
}

/// Placeholder secret for development. Startup fails in production unless
/// JWT_SECRET_KEY overrides it.
pub const DEV_SECRET_PLACEHOLDER: &str = "insecure-dev-secret-change-me";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secret: DEV_SECRET_PLACEHOLDER.to_string(),
            token_ttl_minutes: 24 * 60,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum admitted requests per window per client.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Upper bound on tracked client windows; lapsed windows are swept
    /// when the bound is reached.
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60,
            max_clients: 16_384,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable response caching for read operations.
    pub enabled: bool,

    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Upper bound on stored entries; oldest entries are evicted once
    /// expired ones have been swept.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 4096,
        }
    }
}

/// Request size and CORS policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_request_size: usize,

    /// Allowed CORS origins; `["*"]` means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_request_size: 10 * 1024 * 1024,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Optional directory for a log file; logs go to stderr when unset.
    pub logs_dir: Option<String>,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            logs_dir: None,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Meta Ads API credentials, used by the upstream connector when a
/// request supplies none of its own.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MetaApiConfig {
    pub app_id: String,
    pub app_secret: String,
    pub access_token: String,
    pub account_id: String,
}
