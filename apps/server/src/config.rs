use std::env;
use std::time::Duration;

use crate::models::{MeterAuthority, MeteringPolicy};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub billing: BillingConfig,
    pub metering: MeteringConfig,
}

/// Database connection pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

/// Caller identity configuration
///
/// The server sits behind an auth gateway that resolves the session and
/// forwards the opaque user id in a trusted header.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Header carrying the authenticated user id
    pub header: String,
}

/// Billing provider integration
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Shared secret for the internal plan endpoint. The endpoint rejects
    /// every request when unset.
    pub webhook_secret: Option<String>,
}

/// Metered operation configuration
#[derive(Debug, Clone)]
pub struct MeteringConfig {
    /// Upper bound for a single metered operation
    pub operation_timeout: Duration,
    /// Which counter gates image generation
    pub image_generation: MeterAuthority,
    /// External usage tracker, required when any feature is metered externally
    pub usage_tracker: Option<UsageTrackerConfig>,
}

/// External usage tracker endpoint
#[derive(Debug, Clone)]
pub struct UsageTrackerConfig {
    pub url: String,
    /// HMAC secret used to sign requests
    pub secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            database: DatabaseConfig::from_env()?,
            identity: IdentityConfig::from_env(),
            billing: BillingConfig::from_env(),
            metering: MeteringConfig::from_env()?,
        })
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        Ok(Self {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            acquire_timeout: Duration::from_secs(
                env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            ),
            idle_timeout: Duration::from_secs(
                env::var("DATABASE_IDLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
            ),
            max_lifetime: Duration::from_secs(
                env::var("DATABASE_MAX_LIFETIME_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
            ),
        })
    }
}

impl IdentityConfig {
    /// Load identity configuration from environment variables
    pub fn from_env() -> Self {
        let header = env::var("IDENTITY_HEADER")
            .ok()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "x-user-id".to_string());

        Self { header }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            header: "x-user-id".to_string(),
        }
    }
}

impl BillingConfig {
    /// Load billing configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            webhook_secret: env::var("BILLING_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

impl MeteringConfig {
    /// Load metering configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Zero would time out every operation before it starts
        let operation_timeout = Duration::from_secs(
            env::var("METERED_OPERATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(120),
        );

        let image_generation = match env::var("IMAGE_GENERATION_METER") {
            Ok(value) => value
                .parse::<MeterAuthority>()
                .map_err(|_| ConfigError::InvalidMeterAuthority(value))?,
            Err(_) => MeterAuthority::Ledger,
        };

        let usage_tracker = match env::var("USAGE_TRACKER_URL") {
            Ok(url) if !url.is_empty() => {
                let parsed =
                    url::Url::parse(&url).map_err(|_| ConfigError::InvalidUsageTrackerUrl)?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(ConfigError::InvalidUsageTrackerUrl);
                }
                Some(UsageTrackerConfig {
                    url,
                    secret: env::var("USAGE_TRACKER_SECRET")
                        .ok()
                        .filter(|s| !s.is_empty()),
                })
            }
            _ => None,
        };

        let config = Self {
            operation_timeout,
            image_generation,
            usage_tracker,
        };

        if config.policy().uses_external() && config.usage_tracker.is_none() {
            return Err(ConfigError::MissingUsageTrackerUrl);
        }

        Ok(config)
    }

    /// Metering authority per feature
    pub fn policy(&self) -> MeteringPolicy {
        MeteringPolicy::ledger_only().with_image_generation(self.image_generation)
    }
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(120),
            image_generation: MeterAuthority::Ledger,
            usage_tracker: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    MissingDatabaseUrl,
    InvalidMeterAuthority(String),
    MissingUsageTrackerUrl,
    InvalidUsageTrackerUrl,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid number"),
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL environment variable is required")
            }
            ConfigError::InvalidMeterAuthority(value) => write!(
                f,
                "IMAGE_GENERATION_METER must be 'ledger' or 'external', got '{}'",
                value
            ),
            ConfigError::MissingUsageTrackerUrl => write!(
                f,
                "USAGE_TRACKER_URL is required when a feature is metered externally"
            ),
            ConfigError::InvalidUsageTrackerUrl => {
                write!(f, "USAGE_TRACKER_URL must be a valid HTTP or HTTPS URL")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
