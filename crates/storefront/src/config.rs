//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars)
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection
//!   string; required unless `STOREFRONT_STORE=memory`
//!
//! ## Optional
//! - `STOREFRONT_STORE` - Storage backend: `postgres` (default) or `memory`
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL, used for the origin check
//!   (default: `http://localhost:3000`)
//! - `STOREFRONT_CURRENCY` - ISO 4217 code for new carts (default: USD)
//! - `CART_ADD_RATE_BURST` / `CART_ADD_RATE_WINDOW_SECS` - Add-to-cart rate
//!   limit (default: 30 per 60s per client IP)
//! - `PAYMENT_TIMEOUT_SECS` - Bound on any payment dispatch (default: 30)
//! - `<PROVIDER>_GATEWAY_URL` / `<PROVIDER>_GATEWAY_KEY` - Per-provider
//!   gateway endpoint and secret (e.g. `STRIPE_GATEWAY_URL`); an online
//!   provider without both is simply not offered
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use meridian_core::{CurrencyCode, PaymentMethodType};

use crate::payment::GatewayConfig;

const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// `PostgreSQL` via sqlx. The default.
    Postgres,
    /// In-process memory store with a seeded demo catalog. Dev only.
    Memory,
}

/// Rate limit for `POST /cart/add`, token bucket per client IP.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Bucket capacity.
    pub add_to_cart_burst: u32,
    /// Window over which the bucket refills completely.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            add_to_cart_burst: 30,
            window_secs: 60,
        }
    }
}

/// Payment dispatch configuration.
#[derive(Debug, Clone, Default)]
pub struct PaymentConfig {
    /// Bound on any single payment dispatch, in seconds.
    pub timeout_secs: u64,
    /// Gateway per configured online provider.
    pub gateways: HashMap<PaymentMethodType, GatewayConfig>,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Storage backend selection.
    pub store_backend: StoreBackend,
    /// `PostgreSQL` database connection URL (contains password).
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Public base URL; mutating requests must match its origin.
    pub base_url: String,
    /// Session signing secret.
    pub session_secret: SecretString,
    /// Currency new carts are created in.
    pub currency: CurrencyCode,
    /// Add-to-cart rate limit.
    pub rate_limit: RateLimitConfig,
    /// Payment dispatch settings.
    pub payment: PaymentConfig,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let store_backend = match get_env_or_default("STOREFRONT_STORE", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREFRONT_STORE".to_owned(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };
        let database_url = get_database_url("STOREFRONT_DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "STOREFRONT_DATABASE_URL".to_owned(),
            ));
        }

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_owned(), e.to_string()))?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let session_secret = SecretString::from(get_required_env("STOREFRONT_SESSION_SECRET")?);
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;
        let currency = get_env_or_default("STOREFRONT_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_CURRENCY".to_owned(), e))?;

        Ok(Self {
            store_backend,
            database_url,
            host,
            port,
            base_url,
            session_secret,
            currency,
            rate_limit: RateLimitConfig::from_env()?,
            payment: PaymentConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl RateLimitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            add_to_cart_burst: parse_env_or(
                "CART_ADD_RATE_BURST",
                defaults.add_to_cart_burst,
            )?,
            window_secs: parse_env_or("CART_ADD_RATE_WINDOW_SECS", defaults.window_secs)?,
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = parse_env_or("PAYMENT_TIMEOUT_SECS", 30)?;
        let mut gateways = HashMap::new();
        for method_type in PaymentMethodType::ALL {
            if method_type.is_offline() {
                continue;
            }
            let prefix = gateway_env_prefix(method_type);
            let url_var = format!("{prefix}_GATEWAY_URL");
            let key_var = format!("{prefix}_GATEWAY_KEY");
            let (Some(url), Some(key)) = (get_optional_env(&url_var), get_optional_env(&key_var))
            else {
                continue;
            };
            let endpoint = Url::parse(&url)
                .map_err(|e| ConfigError::InvalidEnvVar(url_var, e.to_string()))?;
            gateways.insert(
                method_type,
                GatewayConfig {
                    endpoint,
                    secret_key: SecretString::from(key),
                },
            );
        }
        Ok(Self {
            timeout_secs,
            gateways,
        })
    }
}

/// `amazon-pay` -> `AMAZON_PAY`, the env-var prefix for a provider.
fn gateway_env_prefix(method_type: PaymentMethodType) -> String {
    method_type.as_str().to_uppercase().replace('-', "_")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}
