use std::{path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::priority::Priority;

pub const SETTLE_DELAY_ENV: &str = "RUN_PROCESS_SETTLE_DELAY_MS";
pub const PRIORITY_ENV: &str = "RUN_PROCESS_PRIORITY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// How long to let a fresh child run before touching its priority.
    pub settle_delay_ms: u64,
    /// Priority used when a launch request does not name one.
    pub default_priority: Priority,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: Self::DEFAULT_SETTLE_DELAY_MS,
            default_priority: Priority::Normal,
        }
    }
}

impl RunnerConfig {
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;
    pub const MAX_SETTLE_DELAY_MS: u64 = 60_000;

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_delay_ms > Self::MAX_SETTLE_DELAY_MS {
            return Err(ConfigError::ValidationError(format!(
                "settle_delay_ms must be at most {} (got {})",
                Self::MAX_SETTLE_DELAY_MS,
                self.settle_delay_ms
            )));
        }
        Ok(())
    }

    /// Override fields from `RUN_PROCESS_*` environment variables.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from any key lookup; unparsable values are logged and
    /// ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(SETTLE_DELAY_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.settle_delay_ms = ms,
                Err(e) => tracing::warn!(key = SETTLE_DELAY_ENV, value = %raw, "Ignoring invalid settle delay: {e}"),
            }
        }
        if let Some(raw) = lookup(PRIORITY_ENV) {
            match Priority::from_str(raw.trim()) {
                Ok(priority) => self.default_priority = priority,
                Err(e) => tracing::warn!(key = PRIORITY_ENV, value = %raw, "Ignoring invalid priority: {e}"),
            }
        }
        self
    }
}

/// Will always return config, falling back to defaults
pub fn load_config_from_file(config_path: &Path) -> RunnerConfig {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => match serde_json::from_str(&raw_config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    "Invalid config file, using defaults: {e}"
                );
                RunnerConfig::default()
            }
        },
        Err(_) => {
            tracing::info!(path = %config_path.display(), "No config file found, using defaults");
            RunnerConfig::default()
        }
    }
}

/// Saves the config to the given path
pub fn save_config_to_file(config: &RunnerConfig, config_path: &Path) -> Result<(), ConfigError> {
    let raw_config = serde_json::to_string_pretty(config)?;
    std::fs::write(config_path, raw_config)?;
    Ok(())
}
