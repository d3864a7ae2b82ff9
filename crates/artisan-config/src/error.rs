use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("failed to read config file '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The config file is not valid JSON for [`crate::KitConfig`].
  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),

  /// A field holds a value outside its allowed range.
  #[error("invalid config field '{field}': {message}")]
  Invalid { field: String, message: String },
}

impl ConfigError {
  pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
    Self::Invalid {
      field: field.to_string(),
      message: message.into(),
    }
  }
}
