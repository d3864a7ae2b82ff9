use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for the generative AI provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
  /// Base URL of the Gemini API, without trailing slash.
  pub gemini_base_url: String,
  /// Model used for text generation and transcription.
  pub text_model: String,
  /// Model used for image generation and editing.
  pub image_model: String,
  /// Environment variable holding the Gemini API key.
  pub api_key_env: String,
  /// Per-request HTTP timeout.
  pub request_timeout_ms: u64,
  /// Vertex AI settings. Required for video generation only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub vertex: Option<VertexConfig>,
}

impl Default for ProviderConfig {
  fn default() -> Self {
    Self {
      gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
      text_model: "gemini-2.0-flash".to_string(),
      image_model: "gemini-2.0-flash-preview-image-generation".to_string(),
      api_key_env: "GEMINI_API_KEY".to_string(),
      request_timeout_ms: 120_000,
      vertex: None,
    }
  }
}

impl ProviderConfig {
  pub(crate) fn validate(&self) -> Result<(), ConfigError> {
    if self.text_model.trim().is_empty() {
      return Err(ConfigError::invalid("provider.text_model", "must not be empty"));
    }
    if self.image_model.trim().is_empty() {
      return Err(ConfigError::invalid("provider.image_model", "must not be empty"));
    }
    if self.request_timeout_ms == 0 {
      return Err(ConfigError::invalid(
        "provider.request_timeout_ms",
        "must be greater than zero",
      ));
    }
    if let Some(vertex) = &self.vertex {
      if vertex.project_id.trim().is_empty() {
        return Err(ConfigError::invalid("provider.vertex.project_id", "must not be empty"));
      }
      if vertex.video_model.trim().is_empty() {
        return Err(ConfigError::invalid("provider.vertex.video_model", "must not be empty"));
      }
    }
    Ok(())
  }
}

/// Vertex AI settings for long-running video generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexConfig {
  pub project_id: String,
  #[serde(default = "default_location")]
  pub location: String,
  #[serde(default = "default_video_model")]
  pub video_model: String,
  /// Environment variable holding an OAuth access token.
  #[serde(default = "default_access_token_env")]
  pub access_token_env: String,
}

fn default_location() -> String {
  "us-central1".to_string()
}

fn default_video_model() -> String {
  "veo-2.0-generate-001".to_string()
}

fn default_access_token_env() -> String {
  "VERTEX_ACCESS_TOKEN".to_string()
}
