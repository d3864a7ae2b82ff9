//! Artisan Config
//!
//! Serializable configuration for the artisan marketing-kit generator.
//!
//! Configuration is a single JSON document. Every field has a default, so an
//! empty object (or no file at all) is a valid configuration:
//!
//! ```json
//! {
//!   "provider": { "text_model": "gemini-2.0-flash" },
//!   "poll": { "interval_ms": 5000, "max_attempts": 120 },
//!   "server": { "bind": "0.0.0.0:3000" }
//! }
//! ```
//!
//! Secrets never live in the file. The provider section names the environment
//! variables that hold them, and they are read when the client is built.

mod error;
mod poll;
mod provider;
mod server;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use error::ConfigError;
pub use poll::PollSettings;
pub use provider::{ProviderConfig, VertexConfig};
pub use server::ServerConfig;

/// Name of the config file looked up in the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitConfig {
  pub provider: ProviderConfig,
  pub poll: PollSettings,
  pub server: ServerConfig,
  /// Where the CLI writes generated assets.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output_dir: Option<PathBuf>,
}

impl KitConfig {
  /// Parse a configuration from a JSON string and validate it.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let config: KitConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Load configuration from a file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;
    Self::from_json(&content)
  }

  /// Load from `path` if given, otherwise from `{data_dir}/config.json` when
  /// that file exists, otherwise fall back to defaults.
  pub fn load_or_default(path: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Self::load(path),
      None => {
        let candidate = data_dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
          Self::load(&candidate)
        } else {
          Ok(Self::default())
        }
      }
    }
  }

  /// Check invariants serde can't express.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.provider.validate()?;
    self.poll.validate()?;
    Ok(())
  }

  /// Resolve the output directory, defaulting to `{data_dir}/outputs`.
  pub fn output_dir_or(&self, data_dir: &Path) -> PathBuf {
    self
      .output_dir
      .clone()
      .unwrap_or_else(|| data_dir.join("outputs"))
  }
}

/// Default data directory: `~/.artisan`.
pub fn default_data_dir() -> Option<PathBuf> {
  dirs::home_dir().map(|home| home.join(".artisan"))
}
