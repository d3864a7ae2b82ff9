//! Generation tasks and their execution.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::client::{GenerationCall, GenerationClient, TaskPayload};
use crate::error::TaskError;
use crate::events::{GenerationEvent, GenerationNotifier};
use crate::poller::Poller;
use crate::request::MediaPayload;
use crate::result::TaskOutcome;

/// Kind of output a task asks the provider for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
  Text,
  Image,
  /// Video generation runs as a long-running operation.
  Video,
}

impl Capability {
  pub fn as_str(&self) -> &'static str {
    match self {
      Capability::Text => "text",
      Capability::Image => "image",
      Capability::Video => "video",
    }
  }

  /// Whether the provider answers with an operation handle to poll.
  pub fn is_long_running(&self) -> bool {
    matches!(self, Capability::Video)
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What a prompt builder produces for one variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlan {
  pub primary: String,
  pub fallback: Option<String>,
  pub capability: Capability,
}

impl TaskPlan {
  pub fn new(capability: Capability, primary: impl Into<String>) -> Self {
    Self {
      primary: primary.into(),
      fallback: None,
      capability,
    }
  }

  pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
    self.fallback = Some(fallback.into());
    self
  }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Pending,
  Running,
  Succeeded,
  FallbackSucceeded,
  Failed,
}

impl TaskStatus {
  /// Succeeded through either the primary or the fallback prompt.
  pub fn is_success(&self) -> bool {
    matches!(self, TaskStatus::Succeeded | TaskStatus::FallbackSucceeded)
  }

  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      TaskStatus::Succeeded | TaskStatus::FallbackSucceeded | TaskStatus::Failed
    )
  }
}

/// One unit of work bound to a single variation.
#[derive(Debug, Clone)]
pub struct GenerationTask {
  pub name: String,
  pub primary_prompt: String,
  pub fallback_prompt: Option<String>,
  pub capability: Capability,
  status: TaskStatus,
}

impl GenerationTask {
  pub fn new(name: impl Into<String>, plan: TaskPlan) -> Self {
    Self {
      name: name.into(),
      primary_prompt: plan.primary,
      fallback_prompt: plan.fallback,
      capability: plan.capability,
      status: TaskStatus::Pending,
    }
  }

  pub fn status(&self) -> TaskStatus {
    self.status
  }

  fn transition(&mut self, next: TaskStatus) {
    debug_assert!(
      !self.status.is_terminal(),
      "task '{}' already settled as {:?}",
      self.name,
      self.status
    );
    self.status = next;
  }
}

/// Per-run data a spawned task needs.
#[derive(Debug, Clone)]
pub struct TaskContext {
  pub request_id: String,
  pub media: Arc<MediaPayload>,
}

/// Runs a single task: primary attempt, then at most one fallback attempt.
pub struct TaskExecutor<N: GenerationNotifier> {
  client: Arc<dyn GenerationClient>,
  poller: Poller,
  notifier: Arc<N>,
}

impl<N: GenerationNotifier> Clone for TaskExecutor<N> {
  fn clone(&self) -> Self {
    Self {
      client: Arc::clone(&self.client),
      poller: self.poller.clone(),
      notifier: Arc::clone(&self.notifier),
    }
  }
}

impl<N: GenerationNotifier> TaskExecutor<N> {
  pub fn new(client: Arc<dyn GenerationClient>, poller: Poller, notifier: Arc<N>) -> Self {
    Self {
      client,
      poller,
      notifier,
    }
  }

  /// Execute a task to a terminal outcome. Never fails: errors are recorded
  /// in the outcome.
  #[instrument(
    name = "task_execute",
    skip(self, task, ctx, cancel),
    fields(
      request_id = %ctx.request_id,
      task = %task.name,
      capability = %task.capability,
    )
  )]
  pub async fn execute(
    &self,
    mut task: GenerationTask,
    ctx: TaskContext,
    cancel: CancellationToken,
  ) -> TaskOutcome {
    task.transition(TaskStatus::Running);
    info!(fallback = task.fallback_prompt.is_some(), "task_started");
    self.notifier.notify(GenerationEvent::TaskStarted {
      request_id: ctx.request_id.clone(),
      task: task.name.clone(),
      capability: task.capability,
    });

    let mut attempts = 1;
    let primary = self
      .attempt(&task.name, &task.primary_prompt, task.capability, &ctx, &cancel)
      .await;

    let result = match (primary, task.fallback_prompt.as_deref()) {
      (Ok(payload), _) => Ok((TaskStatus::Succeeded, payload)),
      (Err(TaskError::Cancelled), _) => Err(TaskError::Cancelled),
      (Err(e), None) => Err(e),
      (Err(primary_error), Some(fallback)) => {
        warn!(error = %primary_error, "task_fallback");
        self.notifier.notify(GenerationEvent::TaskFallback {
          request_id: ctx.request_id.clone(),
          task: task.name.clone(),
          error: primary_error.to_string(),
        });

        attempts += 1;
        self
          .attempt(&task.name, fallback, task.capability, &ctx, &cancel)
          .await
          .map(|payload| (TaskStatus::FallbackSucceeded, payload))
      }
    };

    match result {
      Ok((status, payload)) => {
        task.transition(status);
        info!(status = ?status, attempts, "task_completed");
        self.notifier.notify(GenerationEvent::TaskSucceeded {
          request_id: ctx.request_id,
          task: task.name.clone(),
          status,
        });
        TaskOutcome::succeeded(task.name, status, payload, attempts)
      }
      Err(e) => {
        task.transition(TaskStatus::Failed);
        error!(error = %e, attempts, "task_failed");
        self.notifier.notify(GenerationEvent::TaskFailed {
          request_id: ctx.request_id,
          task: task.name.clone(),
          error: e.to_string(),
        });
        TaskOutcome::failed(task.name, e, attempts)
      }
    }
  }

  /// One provider attempt with the given prompt.
  async fn attempt(
    &self,
    name: &str,
    prompt: &str,
    capability: Capability,
    ctx: &TaskContext,
    cancel: &CancellationToken,
  ) -> Result<TaskPayload, TaskError> {
    let call = GenerationCall {
      prompt,
      capability,
      media: ctx.media.as_ref(),
    };

    if !capability.is_long_running() {
      return tokio::select! {
        _ = cancel.cancelled() => Err(TaskError::Cancelled),
        result = self.client.generate_immediate(&call) => result.map_err(TaskError::from),
      };
    }

    let handle = tokio::select! {
      _ = cancel.cancelled() => return Err(TaskError::Cancelled),
      result = self.client.generate_async(&call) => result?,
    };

    info!(operation = %handle, "operation_submitted");

    let operation = self
      .poller
      .poll_with_progress(&handle, cancel, |attempt, done| {
        self.notifier.notify(GenerationEvent::PollProgress {
          request_id: ctx.request_id.clone(),
          task: name.to_string(),
          attempt,
          done,
        });
      })
      .await?;

    operation.into_payload().map_err(TaskError::from)
  }
}
