//! Configuration management for the booking service.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::CatalogError;
use crate::types::{Money, TierDefinition};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Longest accepted hold time limit (one year)
pub const MAX_HOLD_TIME_LIMIT_SECS: u64 = 365 * 24 * 60 * 60;

/// Errors raised while loading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A `TIER_CATALOG` entry is not `key:label:price:available`
    #[error("Invalid tier catalogue entry '{0}': expected key:label:price:available")]
    InvalidTierEntry(String),

    /// A duration that must be positive is zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// The hold time limit is longer than one year
    #[error("HOLD_TIME_LIMIT_SECS must be at most one year")]
    HoldLimitTooLong,

    /// The tier catalogue parsed but is not usable
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Hold timing
    pub hold: HoldConfig,
    /// Store and process settings
    pub runtime: RuntimeConfig,
    /// Tiers seeded at startup
    pub tiers: Vec<TierDefinition>,
}

/// Hold timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldConfig {
    /// How long an unpaid hold stays payable, in seconds
    pub time_limit_secs: u64,
    /// How often the expiry sweeper runs, in milliseconds
    pub sweep_interval_ms: u64,
}

/// Store and process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of the event broadcast channel
    pub event_broadcast_capacity: usize,
    /// How long shutdown waits for an in-flight action, in seconds
    pub shutdown_timeout_secs: u64,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl BookingConfig {
    /// Load configuration from environment variables
    ///
    /// Numeric variables that are missing or fail to parse use their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `TIER_CATALOG` is malformed or the resulting
    /// configuration fails [`BookingConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let tiers = match env::var("TIER_CATALOG") {
            Ok(catalog) => parse_tier_catalog(&catalog)?,
            Err(_) => defaults.tiers,
        };

        let config = Self {
            hold: HoldConfig {
                time_limit_secs: env::var("HOLD_TIME_LIMIT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.hold.time_limit_secs),
                sweep_interval_ms: env::var("SWEEP_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.hold.sweep_interval_ms),
            },
            runtime: RuntimeConfig {
                event_broadcast_capacity: env::var("EVENT_BROADCAST_CAPACITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|capacity| *capacity > 0)
                    .unwrap_or(defaults.runtime.event_broadcast_capacity),
                shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.runtime.shutdown_timeout_secs),
                log_level: env::var("RUST_LOG").unwrap_or(defaults.runtime.log_level),
            },
            tiers,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the values the service cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroDuration`] for a zero hold limit or sweep
    /// interval, and [`ConfigError::HoldLimitTooLong`] for a hold limit above
    /// [`MAX_HOLD_TIME_LIMIT_SECS`].
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.hold.time_limit_secs == 0 {
            return Err(ConfigError::ZeroDuration("HOLD_TIME_LIMIT_SECS"));
        }
        if self.hold.time_limit_secs > MAX_HOLD_TIME_LIMIT_SECS {
            return Err(ConfigError::HoldLimitTooLong);
        }
        if self.hold.sweep_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("SWEEP_INTERVAL_MS"));
        }
        Ok(())
    }

    /// Hold time limit as a `chrono` duration, capped at [`MAX_HOLD_TIME_LIMIT_SECS`]
    #[must_use]
    pub fn hold_time_limit(&self) -> chrono::Duration {
        let secs = self.hold.time_limit_secs.min(MAX_HOLD_TIME_LIMIT_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or_default())
    }

    /// Sweep period
    #[must_use]
    pub const fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.hold.sweep_interval_ms)
    }

    /// Shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.runtime.shutdown_timeout_secs)
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            hold: HoldConfig {
                time_limit_secs: 600,
                sweep_interval_ms: 1_000,
            },
            runtime: RuntimeConfig {
                event_broadcast_capacity: 256,
                shutdown_timeout_secs: 5,
                log_level: "info".to_string(),
            },
            tiers: vec![
                TierDefinition::new("VIP", "VIP", Money::from_minor(5_000), 20),
                TierDefinition::new("Standard", "Standard", Money::from_minor(2_500), 100),
                TierDefinition::new("Economy", "Economy", Money::from_minor(1_000), 200),
            ],
        }
    }
}

/// Parse a `key:label:price:available;...` catalogue
///
/// Blank entries (e.g. a trailing `;`) are skipped. Duplicate keys and zero
/// prices are caught later, when the booking state is built.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTierEntry`] for an entry without exactly four
/// fields or with a non-numeric price or availability.
pub fn parse_tier_catalog(catalog: &str) -> Result<Vec<TierDefinition>, ConfigError> {
    catalog
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidTierEntry(entry.to_string());
            let fields: Vec<&str> = entry.split(':').map(str::trim).collect();
            let [key, label, price, available] = fields.as_slice() else {
                return Err(invalid());
            };
            let price = price.parse::<u64>().map_err(|_| invalid())?;
            let available = available.parse::<u32>().map_err(|_| invalid())?;

            Ok(TierDefinition::new(
                *key,
                *label,
                Money::from_minor(price),
                available,
            ))
        })
        .collect()
}
