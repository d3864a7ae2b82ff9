//! Generation result types.

use serde::{Deserialize, Serialize};

use crate::client::TaskPayload;
use crate::error::{TaskError, TaskFailure, serialize_error};
use crate::task::TaskStatus;

/// Terminal outcome of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
  pub name: String,
  pub status: TaskStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payload: Option<TaskPayload>,
  #[serde(
    skip_serializing_if = "Option::is_none",
    serialize_with = "serialize_error"
  )]
  pub error: Option<TaskError>,
  /// Provider attempts made (1, or 2 when the fallback ran).
  pub attempts: u32,
}

impl TaskOutcome {
  pub fn succeeded(
    name: impl Into<String>,
    status: TaskStatus,
    payload: TaskPayload,
    attempts: u32,
  ) -> Self {
    debug_assert!(status.is_success());
    Self {
      name: name.into(),
      status,
      payload: Some(payload),
      error: None,
      attempts,
    }
  }

  pub fn failed(name: impl Into<String>, error: TaskError, attempts: u32) -> Self {
    Self {
      name: name.into(),
      status: TaskStatus::Failed,
      payload: None,
      error: Some(error),
      attempts,
    }
  }
}

/// Aggregate status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
  AllSucceeded,
  PartialSuccess,
  AllFailed,
}

impl OverallStatus {
  /// Derive the aggregate status from task statuses.
  ///
  /// `AllFailed` iff every status is `Failed`, `AllSucceeded` iff every status
  /// is a success, `PartialSuccess` otherwise. An empty set counts as
  /// `AllSucceeded`.
  pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a TaskStatus>) -> Self {
    let mut total = 0usize;
    let mut failed = 0usize;
    let mut succeeded = 0usize;

    for status in statuses {
      total += 1;
      if *status == TaskStatus::Failed {
        failed += 1;
      } else if status.is_success() {
        succeeded += 1;
      }
    }

    if total > 0 && failed == total {
      OverallStatus::AllFailed
    } else if succeeded == total {
      OverallStatus::AllSucceeded
    } else {
      OverallStatus::PartialSuccess
    }
  }
}

/// Sealed, ordered outcome of a run.
///
/// Outcomes are in request variation order, whatever order the tasks settled
/// in. There is no way to modify a result once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
  request_id: String,
  overall_status: OverallStatus,
  outcomes: Vec<TaskOutcome>,
}

impl GenerationResult {
  pub fn request_id(&self) -> &str {
    &self.request_id
  }

  pub fn overall_status(&self) -> OverallStatus {
    self.overall_status
  }

  pub fn outcomes(&self) -> &[TaskOutcome] {
    &self.outcomes
  }

  /// Outcome for a variation by name.
  pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
    self.outcomes.iter().find(|o| o.name == name)
  }

  /// Failed tasks with their errors, in request order.
  pub fn failures(&self) -> Vec<TaskFailure> {
    self
      .outcomes
      .iter()
      .filter_map(|o| {
        o.error.clone().map(|error| TaskFailure {
          name: o.name.clone(),
          error,
        })
      })
      .collect()
  }

  pub fn into_outcomes(self) -> Vec<TaskOutcome> {
    self.outcomes
  }
}

/// Write-once slots, one per task, filled as tasks settle.
pub(crate) struct ResultSlots {
  request_id: String,
  names: Vec<String>,
  slots: Vec<Option<TaskOutcome>>,
}

impl ResultSlots {
  pub(crate) fn new(request_id: String, names: Vec<String>) -> Self {
    let slots = vec![None; names.len()];
    Self {
      request_id,
      names,
      slots,
    }
  }

  pub(crate) fn name(&self, index: usize) -> &str {
    &self.names[index]
  }

  /// Fill a slot. Each slot is written exactly once.
  pub(crate) fn fill(&mut self, index: usize, outcome: TaskOutcome) {
    let slot = &mut self.slots[index];
    debug_assert!(slot.is_none(), "slot {} filled twice", index);
    *slot = Some(outcome);
  }

  /// Seal into an immutable result. A slot that never settled is recorded as
  /// a failed task.
  pub(crate) fn seal(self) -> GenerationResult {
    let outcomes: Vec<TaskOutcome> = self
      .slots
      .into_iter()
      .zip(self.names)
      .map(|(slot, name)| {
        slot.unwrap_or_else(|| {
          TaskOutcome::failed(
            name,
            TaskError::Join {
              message: "task did not settle".to_string(),
            },
            0,
          )
        })
      })
      .collect();

    let overall_status = OverallStatus::from_statuses(outcomes.iter().map(|o| &o.status));

    GenerationResult {
      request_id: self.request_id,
      overall_status,
      outcomes,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::GenerationError;
  use serde_json::json;

  const ALL: [TaskStatus; 3] = [
    TaskStatus::Succeeded,
    TaskStatus::FallbackSucceeded,
    TaskStatus::Failed,
  ];

  #[test]
  fn test_aggregate_status_law_exhaustive() {
    // Every non-empty combination of up to three terminal statuses.
    for len in 1..=3u32 {
      for combo in 0..3usize.pow(len) {
        let mut statuses = Vec::new();
        let mut n = combo;
        for _ in 0..len {
          statuses.push(ALL[n % 3]);
          n /= 3;
        }

        let all_failed = statuses.iter().all(|s| *s == TaskStatus::Failed);
        let all_succeeded = statuses.iter().all(|s| s.is_success());
        let expected = if all_failed {
          OverallStatus::AllFailed
        } else if all_succeeded {
          OverallStatus::AllSucceeded
        } else {
          OverallStatus::PartialSuccess
        };

        assert_eq!(
          OverallStatus::from_statuses(&statuses),
          expected,
          "statuses: {:?}",
          statuses
        );
      }
    }
  }

  #[test]
  fn test_slots_keep_request_order() {
    let mut slots = ResultSlots::new(
      "req-1".to_string(),
      vec!["a".to_string(), "b".to_string(), "c".to_string()],
    );

    slots.fill(2, TaskOutcome::succeeded("c", TaskStatus::Succeeded, json!("c"), 1));
    slots.fill(0, TaskOutcome::succeeded("a", TaskStatus::Succeeded, json!("a"), 1));
    slots.fill(1, TaskOutcome::succeeded("b", TaskStatus::FallbackSucceeded, json!("b"), 2));

    let result = slots.seal();
    let names: Vec<&str> = result.outcomes().iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(result.overall_status(), OverallStatus::AllSucceeded);
    assert_eq!(result.request_id(), "req-1");
  }

  #[test]
  fn test_unsettled_slot_seals_as_failed() {
    let mut slots = ResultSlots::new("req-1".to_string(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(slots.name(1), "b");
    slots.fill(0, TaskOutcome::succeeded("a", TaskStatus::Succeeded, json!(1), 1));

    let result = slots.seal();
    assert_eq!(result.overall_status(), OverallStatus::PartialSuccess);
    assert_eq!(result.outcome("b").unwrap().status, TaskStatus::Failed);
    assert_eq!(result.failures().len(), 1);
  }

  #[test]
  fn test_outcome_serialization() {
    let ok = TaskOutcome::succeeded("natural", TaskStatus::Succeeded, json!({ "kind": "text" }), 1);
    let value = serde_json::to_value(&ok).unwrap();
    assert_eq!(value["status"], "succeeded");
    assert!(value.get("error").is_none());

    let failed = TaskOutcome::failed(
      "white_background",
      TaskError::Generation(GenerationError::Http {
        status: 429,
        body: "quota".to_string(),
      }),
      2,
    );
    let value = serde_json::to_value(&failed).unwrap();
    assert_eq!(value["status"], "failed");
    assert_eq!(value["error"], "provider returned HTTP 429: quota");
    assert_eq!(value["attempts"], 2);
    assert!(value.get("payload").is_none());
  }
}
