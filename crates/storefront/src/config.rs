//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FARMGATE_API_URL` - Base URL of the marketplace backend (e.g., `https://api.farmgate.rw`)
//!
//! ## Optional
//! - `FARMGATE_API_TOKEN` - Bearer credential for the backend (cookies are used otherwise)
//! - `FARMGATE_HTTP_TIMEOUT_SECS` - Per-request transport timeout (default: 30)
//! - `FARMGATE_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `FARMGATE_CATALOG_CACHE_CAPACITY` - Catalog cache entries (default: 1000)
//! - `FARMGATE_SAME_KEY_POLICY` - Overlapping same-product cart edits: `reject`, `queue`
//!   or `coalesce` (default: reject)
//! - `FARMGATE_CURRENCY` - Display currency code (default: RWF)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use farmgate_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::SameKeyPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Behavior for overlapping cart edits on the same product
    pub same_key_policy: SameKeyPolicy,
    /// Currency used when formatting prices
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Backend API configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL of the backend (always ends with `/`)
    pub base_url: Url,
    /// Optional bearer token sent with every request
    pub token: Option<SecretString>,
    /// Transport-level request timeout
    pub timeout: Duration,
    /// Time-to-live for cached catalog responses
    pub cache_ttl: Duration,
    /// Maximum number of cached catalog responses
    pub cache_capacity: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

impl ApiConfig {
    /// Configuration for a backend at `base_url` with default transport settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("FARMGATE_API_URL", base_url)?,
            token: None,
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 1000,
        })
    }
}

impl StorefrontConfig {
    /// Configuration for `api` with every other setting at its default.
    #[must_use]
    pub fn new(api: ApiConfig) -> Self {
        Self {
            api,
            same_key_policy: SameKeyPolicy::default(),
            currency: CurrencyCode::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let api = ApiConfig {
            base_url: parse_base_url("FARMGATE_API_URL", &vars.required("FARMGATE_API_URL")?)?,
            token: vars.optional("FARMGATE_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(vars.parsed("FARMGATE_HTTP_TIMEOUT_SECS", 30)?),
            cache_ttl: Duration::from_secs(vars.parsed("FARMGATE_CATALOG_CACHE_TTL_SECS", 300)?),
            cache_capacity: vars.parsed("FARMGATE_CATALOG_CACHE_CAPACITY", 1000)?,
        };

        Ok(Self {
            api,
            same_key_policy: vars.parsed("FARMGATE_SAME_KEY_POLICY", SameKeyPolicy::default())?,
            currency: vars.parsed("FARMGATE_CURRENCY", CurrencyCode::default())?,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Parse a base URL and make sure relative joins keep its path.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
