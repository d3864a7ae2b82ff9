//! Generation request types.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// What a media payload contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
  Image,
  Audio,
}

impl fmt::Display for MediaKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MediaKind::Image => f.write_str("image"),
      MediaKind::Audio => f.write_str("audio"),
    }
  }
}

/// The primary media of a request.
///
/// Opaque to the orchestrator: it is handed unchanged to every task's client
/// call and never inspected beyond logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MediaPayload {
  /// Text-only request.
  #[default]
  None,
  /// Raw bytes uploaded with the request.
  Inline {
    kind: MediaKind,
    mime_type: String,
    data: Bytes,
  },
  /// Media already uploaded to blob storage.
  Reference {
    kind: MediaKind,
    mime_type: Option<String>,
    url: String,
  },
}

impl MediaPayload {
  pub fn inline(kind: MediaKind, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
    Self::Inline {
      kind,
      mime_type: mime_type.into(),
      data: data.into(),
    }
  }

  pub fn reference(kind: MediaKind, url: impl Into<String>, mime_type: Option<String>) -> Self {
    Self::Reference {
      kind,
      mime_type,
      url: url.into(),
    }
  }

  pub fn kind(&self) -> Option<MediaKind> {
    match self {
      MediaPayload::None => None,
      MediaPayload::Inline { kind, .. } | MediaPayload::Reference { kind, .. } => Some(*kind),
    }
  }

  pub fn is_none(&self) -> bool {
    matches!(self, MediaPayload::None)
  }

  /// Short description for log fields, never the content itself.
  pub fn describe(&self) -> String {
    match self {
      MediaPayload::None => "none".to_string(),
      MediaPayload::Inline {
        kind,
        mime_type,
        data,
      } => format!("{} inline {} ({} bytes)", kind, mime_type, data.len()),
      MediaPayload::Reference { kind, url, .. } => format!("{} ref {}", kind, url),
    }
  }
}

/// Input to a pipeline run.
///
/// Immutable once built: the orchestrator only reads it, and the media is
/// shared read-only with every task through an `Arc`.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
  request_id: String,
  media: Arc<MediaPayload>,
  params: serde_json::Map<String, serde_json::Value>,
  variations: Vec<String>,
}

impl GenerationRequest {
  /// Create a request with a freshly generated request ID.
  pub fn new(
    media: MediaPayload,
    params: serde_json::Map<String, serde_json::Value>,
    variations: Vec<String>,
  ) -> Self {
    Self {
      request_id: uuid::Uuid::new_v4().to_string(),
      media: Arc::new(media),
      params,
      variations,
    }
  }

  /// Replace the generated request ID (e.g. with a product ID).
  pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
    self.request_id = request_id.into();
    self
  }

  pub fn request_id(&self) -> &str {
    &self.request_id
  }

  pub fn media(&self) -> &MediaPayload {
    &self.media
  }

  /// A shared handle to the media for spawned tasks.
  pub fn shared_media(&self) -> Arc<MediaPayload> {
    Arc::clone(&self.media)
  }

  pub fn params(&self) -> &serde_json::Map<String, serde_json::Value> {
    &self.params
  }

  /// A parameter as a string, if present and a string.
  pub fn param_str(&self, key: &str) -> Option<&str> {
    self.params.get(key).and_then(|v| v.as_str())
  }

  pub fn variations(&self) -> &[String] {
    &self.variations
  }
}
