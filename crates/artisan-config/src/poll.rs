use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Polling settings for long-running generation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
  /// Delay between status queries.
  pub interval_ms: u64,
  /// Maximum number of status queries before giving up.
  pub max_attempts: u32,
}

impl Default for PollSettings {
  fn default() -> Self {
    Self {
      interval_ms: 5_000,
      max_attempts: 120,
    }
  }
}

impl PollSettings {
  pub fn interval(&self) -> Duration {
    Duration::from_millis(self.interval_ms)
  }

  pub(crate) fn validate(&self) -> Result<(), ConfigError> {
    if self.interval_ms == 0 {
      return Err(ConfigError::invalid("poll.interval_ms", "must be greater than zero"));
    }
    if self.max_attempts == 0 {
      return Err(ConfigError::invalid("poll.max_attempts", "must be greater than zero"));
    }
    Ok(())
  }
}
