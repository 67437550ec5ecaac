// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker configuration: key namespace, timing knobs, and Redis connection
//! settings. Resolvable from environment variables following the daemon's
//! `env.rs` convention, or built programmatically via [`BrokerConfigBuilder`].

use thiserror::Error;

/// Default key namespace root.
pub const DEFAULT_PREFIX: &str = "async-job";
/// Default delayed-sweeper period, in seconds.
pub const DEFAULT_RESOLUTION_SECS: f64 = 10.0;
/// Default heartbeat interval, in seconds.
pub const DEFAULT_DELAY_SECS: f64 = 5.0;
/// Default liveness TTL multiplier.
pub const DEFAULT_FACTOR: f64 = 2.0;
/// Default Redis connection string.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("resolution must be > 0, got {0}")]
    InvalidResolution(f64),
    #[error("delay must be > 0, got {0}")]
    InvalidDelay(f64),
    #[error("factor must be >= 2, got {0}")]
    InvalidFactor(f64),
    #[error("prefix must not be empty")]
    EmptyPrefix,
}

/// Broker construction options.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub prefix: String,
    pub resolution_secs: f64,
    pub delay_secs: f64,
    pub factor: f64,
    pub redis_url: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            resolution_secs: DEFAULT_RESOLUTION_SECS,
            delay_secs: DEFAULT_DELAY_SECS,
            factor: DEFAULT_FACTOR,
            redis_url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn builder() -> BrokerConfigBuilder {
        BrokerConfigBuilder::default()
    }

    /// Resolve configuration from environment variables, falling back to
    /// the documented defaults. Mirrors the daemon's `OJ_STATE_DIR`-style
    /// env-var resolution in `env.rs`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = BrokerConfigBuilder::default();
        if let Ok(prefix) = std::env::var("BROKER_PREFIX") {
            builder = builder.prefix(prefix);
        }
        if let Some(v) = parse_env_f64("BROKER_RESOLUTION_SECS") {
            builder = builder.resolution_secs(v);
        }
        if let Some(v) = parse_env_f64("BROKER_HEARTBEAT_SECS") {
            builder = builder.delay_secs(v);
        }
        if let Some(v) = parse_env_f64("BROKER_LIVENESS_FACTOR") {
            builder = builder.factor(v);
        }
        if let Ok(url) = std::env::var("BROKER_REDIS_URL") {
            builder = builder.redis_url(url);
        }
        builder.build()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if !(self.resolution_secs > 0.0) {
            return Err(ConfigError::InvalidResolution(self.resolution_secs));
        }
        if !(self.delay_secs > 0.0) {
            return Err(ConfigError::InvalidDelay(self.delay_secs));
        }
        if !(self.factor >= 2.0) {
            return Err(ConfigError::InvalidFactor(self.factor));
        }
        Ok(())
    }

    /// `{prefix}:jobs` — job store hash key.
    pub fn jobs_key(&self) -> String {
        format!("{}:jobs", self.prefix)
    }

    /// `{prefix}:ready` — ready queue list key.
    pub fn ready_key(&self) -> String {
        format!("{}:ready", self.prefix)
    }

    /// `{prefix}:delayed` — delayed set key.
    pub fn delayed_key(&self) -> String {
        format!("{}:delayed", self.prefix)
    }

    /// `{prefix}:processing` — processing namespace root (workers nest under this).
    pub fn processing_root(&self) -> String {
        format!("{}:processing", self.prefix)
    }

    /// Liveness TTL, in seconds, rounded up: `ceil(delay * factor)`.
    pub fn liveness_ttl_secs(&self) -> u64 {
        (self.delay_secs * self.factor).ceil() as u64
    }
}

pub struct BrokerConfigBuilder {
    prefix: String,
    resolution_secs: f64,
    delay_secs: f64,
    factor: f64,
    redis_url: String,
}

impl Default for BrokerConfigBuilder {
    fn default() -> Self {
        let d = BrokerConfig::default();
        Self {
            prefix: d.prefix,
            resolution_secs: d.resolution_secs,
            delay_secs: d.delay_secs,
            factor: d.factor,
            redis_url: d.redis_url,
        }
    }
}

impl BrokerConfigBuilder {
    crate::setters! {
        into {
            prefix: String,
            redis_url: String,
        }
        set {
            resolution_secs: f64,
            delay_secs: f64,
            factor: f64,
        }
    }

    pub fn build(self) -> Result<BrokerConfig, ConfigError> {
        let config = BrokerConfig {
            prefix: self.prefix,
            resolution_secs: self.resolution_secs,
            delay_secs: self.delay_secs,
            factor: self.factor,
            redis_url: self.redis_url,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|s| s.parse::<f64>().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
