//! External generation client interface.
//!
//! The orchestrator and poller only ever talk to a provider through
//! [`GenerationClient`]. Endpoint shapes, authentication and response parsing
//! belong to the implementation.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::request::MediaPayload;
use crate::task::Capability;

/// Output of a successful generation. Opaque to the orchestrator.
pub type TaskPayload = serde_json::Value;

/// Arguments of one provider call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationCall<'a> {
  pub prompt: &'a str,
  pub capability: Capability,
  pub media: &'a MediaPayload,
}

/// Opaque token identifying an in-flight provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
  name: String,
  submitted_at: DateTime<Utc>,
}

impl OperationHandle {
  /// Wrap an operation name returned by the provider, stamped with the
  /// current time as the submission time.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      submitted_at: Utc::now(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn submitted_at(&self) -> DateTime<Utc> {
    self.submitted_at
  }
}

impl fmt::Display for OperationHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

/// One status query's answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
  pub done: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub response: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<serde_json::Value>,
}

impl OperationStatus {
  pub fn pending() -> Self {
    Self::default()
  }

  pub fn completed(response: serde_json::Value) -> Self {
    Self {
      done: true,
      response: Some(response),
      error: None,
    }
  }

  pub fn failed(error: serde_json::Value) -> Self {
    Self {
      done: true,
      response: None,
      error: Some(error),
    }
  }
}

/// A generative AI provider.
///
/// `generate_immediate` serves text and image tasks. Video-class tasks use
/// `generate_async` to obtain a handle and `check_status` to observe it.
/// Clients that cannot do long-running work keep the default
/// implementations, which report [`GenerationError::Unsupported`].
#[async_trait]
pub trait GenerationClient: Send + Sync {
  /// Run a generation and return its output.
  async fn generate_immediate(
    &self,
    call: &GenerationCall<'_>,
  ) -> Result<TaskPayload, GenerationError>;

  /// Submit a long-running generation and return its operation handle.
  async fn generate_async(
    &self,
    call: &GenerationCall<'_>,
  ) -> Result<OperationHandle, GenerationError> {
    Err(GenerationError::Unsupported {
      capability: format!("async {}", call.capability),
    })
  }

  /// Query the status of a long-running operation.
  async fn check_status(
    &self,
    _handle: &OperationHandle,
  ) -> Result<OperationStatus, GenerationError> {
    Err(GenerationError::Unsupported {
      capability: "operation status".to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  struct TextOnly;

  #[async_trait]
  impl GenerationClient for TextOnly {
    async fn generate_immediate(
      &self,
      call: &GenerationCall<'_>,
    ) -> Result<TaskPayload, GenerationError> {
      Ok(json!({ "kind": "text", "text": call.prompt }))
    }
  }

  #[tokio::test]
  async fn test_default_async_is_unsupported() {
    let client = TextOnly;
    let media = MediaPayload::None;
    let call = GenerationCall {
      prompt: "make a video",
      capability: Capability::Video,
      media: &media,
    };

    let err = client.generate_async(&call).await.unwrap_err();
    assert_eq!(
      err,
      GenerationError::Unsupported {
        capability: "async video".to_string()
      }
    );

    let handle = OperationHandle::new("operations/1");
    assert!(client.check_status(&handle).await.is_err());
  }

  #[test]
  fn test_operation_status_deserializes_missing_fields() {
    let status: OperationStatus = serde_json::from_value(json!({ "done": false })).unwrap();
    assert_eq!(status, OperationStatus::pending());

    let status: OperationStatus =
      serde_json::from_value(json!({ "done": true, "response": { "uri": "gs://x" } })).unwrap();
    assert_eq!(status, OperationStatus::completed(json!({ "uri": "gs://x" })));
  }

  #[test]
  fn test_handle_display() {
    let handle = OperationHandle::new("projects/p/operations/42");
    assert_eq!(handle.to_string(), "projects/p/operations/42");
    assert!(handle.submitted_at() <= Utc::now());
  }
}
