//! Vertex AI Veo long-running video generation.
//!
//! Submission goes to `{model}:predictLongRunning`, which answers with an
//! operation name. The operation is observed by posting that name to
//! `{model}:fetchPredictOperation` on the model that issued it.

use artisan_config::VertexConfig;
use artisan_pipeline::{GenerationError, MediaKind, MediaPayload, OperationStatus};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use crate::gemini::default_mime_type;

/// Base URL of the regional Vertex AI endpoint.
pub(crate) fn regional_base_url(location: &str) -> String {
  format!("https://{}-aiplatform.googleapis.com/v1", location)
}

/// Resource path of the configured video model.
pub(crate) fn model_path(config: &VertexConfig) -> String {
  format!(
    "projects/{}/locations/{}/publishers/google/models/{}",
    config.project_id, config.location, config.video_model
  )
}

pub(crate) fn submit_endpoint(base_url: &str, model_path: &str) -> String {
  format!("{}/{}:predictLongRunning", base_url, model_path)
}

/// Status endpoint for an operation, on the model that issued it.
///
/// Falls back to `default_model_path` when the name is not a model-scoped
/// operation name.
pub(crate) fn status_endpoint(base_url: &str, operation: &str, default_model_path: &str) -> String {
  let model_path = operation
    .split_once("/operations/")
    .map(|(model, _)| model)
    .unwrap_or(default_model_path);
  format!("{}/{}:fetchPredictOperation", base_url, model_path)
}

/// Build the `predictLongRunning` body. Only image media seeds a video.
pub(crate) fn submit_body(prompt: &str, media: &MediaPayload) -> Result<Value, GenerationError> {
  let mut instance = json!({ "prompt": prompt });

  match media {
    MediaPayload::Inline {
      kind: MediaKind::Image,
      mime_type,
      data,
    } => {
      instance["image"] = json!({
        "bytesBase64Encoded": BASE64.encode(data),
        "mimeType": mime_type,
      });
    }
    MediaPayload::Reference {
      kind: MediaKind::Image,
      mime_type,
      url,
    } => {
      if !url.starts_with("gs://") {
        return Err(GenerationError::Unsupported {
          capability: format!("video from non-gcs image reference '{}'", url),
        });
      }
      instance["image"] = json!({
        "gcsUri": url,
        "mimeType": mime_type.as_deref().unwrap_or(default_mime_type(MediaKind::Image)),
      });
    }
    _ => {}
  }

  Ok(json!({
    "instances": [instance],
    "parameters": { "sampleCount": 1 },
  }))
}

/// Read the operation name out of a submission response.
pub(crate) fn parse_submit_response(body: &Value) -> Result<String, GenerationError> {
  body
    .get("name")
    .and_then(Value::as_str)
    .filter(|name| !name.is_empty())
    .map(str::to_string)
    .ok_or_else(|| GenerationError::MalformedPayload {
      message: "operation response has no name".to_string(),
    })
}

/// Read an operation status.
///
/// A finished response is tagged `"kind": "video"`. A finished operation
/// whose videos were all withheld by safety filters is reported as failed
/// rather than as an empty response.
pub(crate) fn parse_status_response(body: Value) -> Result<OperationStatus, GenerationError> {
  let mut status: OperationStatus =
    serde_json::from_value(body).map_err(|e| GenerationError::MalformedPayload {
      message: format!("invalid operation status: {}", e),
    })?;

  if let Some(response) = &status.response {
    let has_videos = response
      .get("videos")
      .and_then(Value::as_array)
      .is_some_and(|videos| !videos.is_empty());
    let filtered = response
      .get("raiMediaFilteredCount")
      .and_then(Value::as_u64)
      .unwrap_or(0);

    if status.done && !has_videos && filtered > 0 {
      status.error = Some(json!({
        "message": format!("{} video(s) withheld by safety filters", filtered),
      }));
    }
  }

  if status.done && status.error.is_none() {
    if let Some(Value::Object(response)) = status.response.as_mut() {
      response.insert("kind".to_string(), json!("video"));
    }
  }

  Ok(status)
}
