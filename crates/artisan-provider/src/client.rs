use std::time::Duration;

use artisan_config::{ProviderConfig, VertexConfig};
use artisan_pipeline::{
  Capability, GenerationCall, GenerationClient, GenerationError, OperationHandle, OperationStatus,
  TaskPayload,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::ProviderError;
use crate::{gemini, vertex};

/// Vertex settings resolved at construction.
#[derive(Debug, Clone)]
struct VertexTarget {
  base_url: String,
  model_path: String,
  access_token: String,
}

/// [`GenerationClient`] backed by the Gemini API and Vertex AI Veo.
///
/// Text and image tasks call Gemini `generateContent`. Video tasks require
/// Vertex settings; without them they fail as unsupported.
#[derive(Debug, Clone)]
pub struct GoogleGenAiClient {
  http: Client,
  base_url: String,
  text_model: String,
  image_model: String,
  api_key: String,
  vertex: Option<VertexTarget>,
}

impl GoogleGenAiClient {
  /// Build a client, reading credentials from the environment variables the
  /// config names.
  pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
    let api_key = read_env(&config.api_key_env)?;
    let vertex_token = config
      .vertex
      .as_ref()
      .map(|vertex| read_env(&vertex.access_token_env))
      .transpose()?;
    Self::with_credentials(config, api_key, vertex_token)
  }

  /// Build a client with explicit credentials.
  pub fn with_credentials(
    config: &ProviderConfig,
    api_key: impl Into<String>,
    vertex_access_token: Option<String>,
  ) -> Result<Self, ProviderError> {
    let http = Client::builder()
      .timeout(Duration::from_millis(config.request_timeout_ms))
      .build()?;

    let vertex = match (&config.vertex, vertex_access_token) {
      (Some(vertex), Some(access_token)) => Some(vertex_target(vertex, access_token)),
      (Some(vertex), None) => {
        return Err(ProviderError::MissingCredential {
          env: vertex.access_token_env.clone(),
        });
      }
      (None, _) => None,
    };

    Ok(Self {
      http,
      base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
      text_model: config.text_model.clone(),
      image_model: config.image_model.clone(),
      api_key: api_key.into(),
      vertex,
    })
  }

  /// Send Vertex requests to `base_url` instead of the regional endpoint.
  pub fn with_vertex_base_url(mut self, base_url: impl Into<String>) -> Self {
    if let Some(vertex) = &mut self.vertex {
      vertex.base_url = base_url.into();
    }
    self
  }

  fn model_for(&self, capability: Capability) -> &str {
    match capability {
      Capability::Image => &self.image_model,
      _ => &self.text_model,
    }
  }

  fn vertex(&self) -> Result<&VertexTarget, GenerationError> {
    self.vertex.as_ref().ok_or_else(|| GenerationError::Unsupported {
      capability: "video (vertex not configured)".to_string(),
    })
  }

  fn vertex_post(&self, target: &VertexTarget, url: &str) -> RequestBuilder {
    self.http.post(url).bearer_auth(&target.access_token)
  }
}

fn vertex_target(config: &VertexConfig, access_token: String) -> VertexTarget {
  VertexTarget {
    base_url: vertex::regional_base_url(&config.location),
    model_path: vertex::model_path(config),
    access_token,
  }
}

fn read_env(name: &str) -> Result<String, ProviderError> {
  std::env::var(name)
    .ok()
    .filter(|value| !value.trim().is_empty())
    .ok_or_else(|| ProviderError::MissingCredential {
      env: name.to_string(),
    })
}

/// Send a request and decode a JSON body, mapping failures to
/// [`GenerationError`].
async fn send_json(request: RequestBuilder) -> Result<Value, GenerationError> {
  let response = request
    .send()
    .await
    .map_err(|e| GenerationError::Transport {
      message: e.to_string(),
    })?;

  let status = response.status();
  let body = response
    .text()
    .await
    .map_err(|e| GenerationError::Transport {
      message: e.to_string(),
    })?;

  if !status.is_success() {
    warn!(status = status.as_u16(), "provider_http_error");
    return Err(GenerationError::Http {
      status: status.as_u16(),
      body,
    });
  }

  serde_json::from_str(&body).map_err(|e| GenerationError::MalformedPayload {
    message: format!("response is not json: {}", e),
  })
}

#[async_trait]
impl GenerationClient for GoogleGenAiClient {
  #[instrument(
    name = "gemini_generate",
    skip(self, call),
    fields(capability = %call.capability, media = %call.media.describe())
  )]
  async fn generate_immediate(&self, call: &GenerationCall<'_>) -> Result<TaskPayload, GenerationError> {
    if call.capability.is_long_running() {
      return Err(GenerationError::Unsupported {
        capability: format!("immediate {}", call.capability),
      });
    }

    let model = self.model_for(call.capability);
    let url = gemini::endpoint(&self.base_url, model);
    let body = gemini::request_body(call.prompt, call.capability, call.media);
    debug!(model, "gemini_request");

    let response = send_json(
      self
        .http
        .post(&url)
        .header("x-goog-api-key", &self.api_key)
        .json(&body),
    )
    .await?;

    gemini::parse_response(call.capability, &response)
  }

  #[instrument(name = "veo_submit", skip(self, call), fields(media = %call.media.describe()))]
  async fn generate_async(&self, call: &GenerationCall<'_>) -> Result<OperationHandle, GenerationError> {
    if call.capability != Capability::Video {
      return Err(GenerationError::Unsupported {
        capability: format!("async {}", call.capability),
      });
    }

    let target = self.vertex()?;
    let url = vertex::submit_endpoint(&target.base_url, &target.model_path);
    let body = vertex::submit_body(call.prompt, call.media)?;

    let response = send_json(self.vertex_post(target, &url).json(&body)).await?;
    let name = vertex::parse_submit_response(&response)?;
    debug!(operation = %name, "veo_submitted");

    Ok(OperationHandle::new(name))
  }

  #[instrument(name = "veo_status", skip(self, handle), fields(operation = %handle))]
  async fn check_status(&self, handle: &OperationHandle) -> Result<OperationStatus, GenerationError> {
    let target = self.vertex()?;
    let url = vertex::status_endpoint(&target.base_url, handle.name(), &target.model_path);
    let body = serde_json::json!({ "operationName": handle.name() });

    let response = send_json(self.vertex_post(target, &url).json(&body)).await?;
    vertex::parse_status_response(response)
  }
}
