use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::capabilities::SimulatedLinkConfig;
use crate::DEFAULT_FEEDBACK_TTL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// How long a feedback message stays visible.
    pub feedback_ttl_ms: u64,
    pub simulated_link: SimulatedLinkConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            feedback_ttl_ms: u64::try_from(DEFAULT_FEEDBACK_TTL.as_millis()).unwrap_or(3000),
            simulated_link: SimulatedLinkConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feedback_ttl_ms == 0 {
            return Err(ConfigError::Validation("feedback_ttl_ms must be > 0".into()));
        }
        let rate = self.simulated_link.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::Validation(format!(
                "simulated_link.failure_rate must be within [0, 1], got {rate}"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn feedback_ttl(&self) -> Duration {
        Duration::from_millis(self.feedback_ttl_ms)
    }
}
