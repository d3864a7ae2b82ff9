//! Pipeline error types.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// A single provider call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
  /// The provider answered with a non-success status.
  #[error("provider returned HTTP {status}: {body}")]
  Http { status: u16, body: String },

  /// The request never produced a response (connect, timeout, TLS).
  #[error("provider request failed: {message}")]
  Transport { message: String },

  /// The response could not be decoded or carried no usable output.
  #[error("malformed provider payload: {message}")]
  MalformedPayload { message: String },

  /// The provider refused the prompt or the output on safety grounds.
  #[error("content rejected by provider safety filters: {reason}")]
  SafetyRejected { reason: String },

  /// A long-running operation finished and reported an error.
  #[error("provider reported failure: {message}")]
  Provider { message: String },

  /// The client does not implement the requested capability.
  #[error("capability not supported by this client: {capability}")]
  Unsupported { capability: String },
}

/// Polling a long-running operation did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
  /// The attempt budget ran out before the operation reported done.
  #[error("operation '{handle}' not done after {attempts} status queries")]
  Timeout { handle: String, attempts: u32 },

  /// The operation reported done with neither a response nor an error.
  #[error("operation '{handle}' finished without a response or an error")]
  EmptyResult { handle: String },

  /// A status query itself failed.
  #[error("status query failed: {0}")]
  Status(#[from] GenerationError),

  /// Polling was cancelled by the caller.
  #[error("polling cancelled")]
  Cancelled,
}

/// Terminal failure of one task (after fallback, if any).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
  #[error(transparent)]
  Generation(#[from] GenerationError),

  #[error("operation not done after {attempts} status queries")]
  PollTimeout { attempts: u32 },

  #[error("operation finished with an empty result")]
  EmptyResult,

  #[error("task cancelled")]
  Cancelled,

  /// The spawned task panicked or was aborted.
  #[error("task aborted: {message}")]
  Join { message: String },
}

impl From<PollError> for TaskError {
  fn from(err: PollError) -> Self {
    match err {
      PollError::Timeout { attempts, .. } => TaskError::PollTimeout { attempts },
      PollError::EmptyResult { .. } => TaskError::EmptyResult,
      PollError::Status(source) => TaskError::Generation(source),
      PollError::Cancelled => TaskError::Cancelled,
    }
  }
}

/// Serialize an error as its display string.
///
/// Raw provider errors are summarized rather than exposed as structures.
pub(crate) fn serialize_error<S: Serializer>(
  error: &Option<TaskError>,
  serializer: S,
) -> Result<S::Ok, S::Error> {
  match error {
    Some(error) => serializer.serialize_str(&error.to_string()),
    None => serializer.serialize_none(),
  }
}

/// A failed task, as carried by [`PipelineError::AllTasksFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
  pub name: String,
  #[serde(serialize_with = "serialize_task_error")]
  pub error: TaskError,
}

fn serialize_task_error<S: Serializer>(error: &TaskError, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(&error.to_string())
}

impl fmt::Display for TaskFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.name, self.error)
  }
}

/// A prompt builder could not produce a plan for a variation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
  #[error("no prompt template for variation '{variation}'")]
  UnknownVariation { variation: String },

  #[error("failed to render prompt for variation '{variation}': {message}")]
  Render { variation: String, message: String },
}

/// Errors surfaced by [`crate::Orchestrator::run`].
///
/// Individual task failures never appear here unless every task failed.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// The request breaks an input constraint (empty or duplicate variations).
  #[error("invalid request: {message}")]
  InvalidRequest { message: String },

  /// The prompt builder failed; no task was launched.
  #[error("failed to build prompts for variation '{variation}': {source}")]
  PromptBuild {
    variation: String,
    #[source]
    source: PromptError,
  },

  /// Every task failed, including fallbacks.
  #[error("all {} generation tasks failed", failures.len())]
  AllTasksFailed { failures: Vec<TaskFailure> },

  /// The caller cancelled the run.
  #[error("generation run cancelled")]
  Cancelled,
}

impl PipelineError {
  /// One-line summary of per-task causes, for logs and error responses.
  pub fn details(&self) -> Option<String> {
    match self {
      PipelineError::AllTasksFailed { failures } => Some(
        failures
          .iter()
          .map(|f| f.to_string())
          .collect::<Vec<_>>()
          .join("; "),
      ),
      PipelineError::PromptBuild { source, .. } => Some(source.to_string()),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_poll_error_conversion() {
    let timeout = PollError::Timeout {
      handle: "op-1".to_string(),
      attempts: 120,
    };
    assert_eq!(TaskError::from(timeout), TaskError::PollTimeout { attempts: 120 });

    let status = PollError::Status(GenerationError::Transport {
      message: "reset".to_string(),
    });
    assert!(matches!(
      TaskError::from(status),
      TaskError::Generation(GenerationError::Transport { .. })
    ));

    assert_eq!(
      TaskError::from(PollError::EmptyResult {
        handle: "op-1".to_string()
      }),
      TaskError::EmptyResult
    );
  }

  #[test]
  fn test_all_failed_details() {
    let err = PipelineError::AllTasksFailed {
      failures: vec![
        TaskFailure {
          name: "natural".to_string(),
          error: TaskError::Generation(GenerationError::Http {
            status: 500,
            body: "boom".to_string(),
          }),
        },
        TaskFailure {
          name: "video".to_string(),
          error: TaskError::PollTimeout { attempts: 3 },
        },
      ],
    };

    assert_eq!(err.to_string(), "all 2 generation tasks failed");
    assert_eq!(
      err.details().unwrap(),
      "natural: provider returned HTTP 500: boom; video: operation not done after 3 status queries"
    );
  }

  #[test]
  fn test_task_failure_serializes_error_as_string() {
    let failure = TaskFailure {
      name: "caption".to_string(),
      error: TaskError::Generation(GenerationError::SafetyRejected {
        reason: "SAFETY".to_string(),
      }),
    };
    let value = serde_json::to_value(&failure).unwrap();
    assert_eq!(value["name"], "caption");
    assert_eq!(
      value["error"],
      "content rejected by provider safety filters: SAFETY"
    );
  }
}
