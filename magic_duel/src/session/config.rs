//! Coordinator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::config::{ConfigError, parse_env_or};

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Messages a game actor buffers before senders wait (default: 64)
    pub inbox_capacity: usize,

    /// Notifications buffered per subscriber before they are dropped (default: 32)
    pub notification_capacity: usize,

    /// Deadline for a single storage call in milliseconds (default: 5000)
    pub storage_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 64,
            notification_capacity: 32,
            storage_timeout_ms: 5000,
        }
    }
}

impl CoordinatorConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables, all optional:
    /// - `MD_INBOX_CAPACITY`
    /// - `MD_NOTIFICATION_CAPACITY`
    /// - `MD_STORAGE_TIMEOUT_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            inbox_capacity: parse_env_or("MD_INBOX_CAPACITY", defaults.inbox_capacity)?,
            notification_capacity: parse_env_or(
                "MD_NOTIFICATION_CAPACITY",
                defaults.notification_capacity,
            )?,
            storage_timeout_ms: parse_env_or("MD_STORAGE_TIMEOUT_MS", defaults.storage_timeout_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "inbox_capacity",
                value: self.inbox_capacity.to_string(),
            });
        }

        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "notification_capacity",
                value: self.notification_capacity.to_string(),
            });
        }

        if self.storage_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "storage_timeout_ms",
                value: self.storage_timeout_ms.to_string(),
            });
        }

        Ok(())
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }
}
