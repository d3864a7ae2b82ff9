//! Long-running operation polling.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::{GenerationClient, OperationHandle, TaskPayload};
use crate::error::{GenerationError, PollError};

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
  /// Delay between consecutive status queries.
  pub interval: Duration,
  /// Maximum number of status queries.
  pub max_attempts: u32,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(5),
      max_attempts: 120,
    }
  }
}

/// A provider operation observed as done.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRunningOperation {
  pub operation_handle: String,
  pub submitted_at: DateTime<Utc>,
  pub done: bool,
  pub response: Option<serde_json::Value>,
  pub error: Option<serde_json::Value>,
  /// Status queries made before `done` was observed.
  pub attempts: u32,
}

impl LongRunningOperation {
  /// Convert into the task payload, or the error the service reported.
  pub fn into_payload(self) -> Result<TaskPayload, GenerationError> {
    match (self.error, self.response) {
      (Some(error), _) => Err(GenerationError::Provider {
        message: error_message(&error),
      }),
      (None, Some(response)) => Ok(response),
      (None, None) => Err(GenerationError::MalformedPayload {
        message: format!("operation '{}' has no response", self.operation_handle),
      }),
    }
  }
}

/// Pull a readable message out of a provider error object.
fn error_message(error: &serde_json::Value) -> String {
  error
    .get("message")
    .and_then(|m| m.as_str())
    .map(str::to_string)
    .unwrap_or_else(|| error.to_string())
}

/// Resolves operation handles by polling the client at a fixed interval.
///
/// Each poll suspends only the task awaiting it; the poller holds no lock and
/// no state shared between operations.
#[derive(Clone)]
pub struct Poller {
  client: Arc<dyn GenerationClient>,
  config: PollConfig,
}

impl Poller {
  pub fn new(client: Arc<dyn GenerationClient>, config: PollConfig) -> Self {
    Self { client, config }
  }

  pub fn config(&self) -> PollConfig {
    self.config
  }

  /// Poll until the operation reports done, the budget runs out, or the
  /// token is cancelled.
  pub async fn poll(
    &self,
    handle: &OperationHandle,
    cancel: &CancellationToken,
  ) -> Result<LongRunningOperation, PollError> {
    self.poll_with_progress(handle, cancel, |_, _| {}).await
  }

  /// Like [`Poller::poll`], calling `progress(attempt, done)` after every
  /// status query.
  #[instrument(
    name = "operation_poll",
    skip(self, handle, cancel, progress),
    fields(
      operation = %handle,
      interval_ms = self.config.interval.as_millis() as u64,
      max_attempts = self.config.max_attempts,
    )
  )]
  pub async fn poll_with_progress<F>(
    &self,
    handle: &OperationHandle,
    cancel: &CancellationToken,
    mut progress: F,
  ) -> Result<LongRunningOperation, PollError>
  where
    F: FnMut(u32, bool) + Send,
  {
    let max_attempts = self.config.max_attempts;

    for attempt in 1..=max_attempts {
      let status = tokio::select! {
        _ = cancel.cancelled() => return Err(PollError::Cancelled),
        status = self.client.check_status(handle) => status?,
      };

      debug!(attempt, done = status.done, "operation_status");
      progress(attempt, status.done);

      if status.done {
        if status.response.is_none() && status.error.is_none() {
          warn!(attempt, "operation_done_without_result");
          return Err(PollError::EmptyResult {
            handle: handle.name().to_string(),
          });
        }

        info!(attempt, failed = status.error.is_some(), "operation_done");
        return Ok(LongRunningOperation {
          operation_handle: handle.name().to_string(),
          submitted_at: handle.submitted_at(),
          done: true,
          response: status.response,
          error: status.error,
          attempts: attempt,
        });
      }

      if attempt < max_attempts {
        tokio::select! {
          _ = cancel.cancelled() => return Err(PollError::Cancelled),
          _ = tokio::time::sleep(self.config.interval) => {}
        }
      }
    }

    warn!(attempts = max_attempts, "operation_poll_timeout");
    Err(PollError::Timeout {
      handle: handle.name().to_string(),
      attempts: max_attempts,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn operation(response: Option<serde_json::Value>, error: Option<serde_json::Value>) -> LongRunningOperation {
    LongRunningOperation {
      operation_handle: "operations/1".to_string(),
      submitted_at: Utc::now(),
      done: true,
      response,
      error,
      attempts: 1,
    }
  }

  #[test]
  fn test_into_payload_response() {
    let payload = operation(Some(json!({ "videos": [] })), None).into_payload().unwrap();
    assert_eq!(payload, json!({ "videos": [] }));
  }

  #[test]
  fn test_into_payload_error_wins() {
    let err = operation(
      Some(json!({ "videos": [] })),
      Some(json!({ "code": 3, "message": "prompt blocked" })),
    )
    .into_payload()
    .unwrap_err();
    assert_eq!(
      err,
      GenerationError::Provider {
        message: "prompt blocked".to_string()
      }
    );
  }

  #[test]
  fn test_into_payload_error_without_message() {
    let err = operation(None, Some(json!("quota"))).into_payload().unwrap_err();
    assert_eq!(
      err,
      GenerationError::Provider {
        message: "\"quota\"".to_string()
      }
    );
  }

  #[test]
  fn test_default_config() {
    let config = PollConfig::default();
    assert_eq!(config.interval, Duration::from_secs(5));
    assert_eq!(config.max_attempts, 120);
  }
}
