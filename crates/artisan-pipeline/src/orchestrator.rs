//! Fan-out/fan-in orchestration of generation tasks.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::client::GenerationClient;
use crate::error::{PipelineError, TaskError};
use crate::events::{GenerationEvent, GenerationNotifier, NoopNotifier};
use crate::poller::{PollConfig, Poller};
use crate::prompt::PromptBuilder;
use crate::request::GenerationRequest;
use crate::result::{GenerationResult, OverallStatus, ResultSlots, TaskOutcome};
use crate::task::{GenerationTask, TaskContext, TaskExecutor, TaskPlan};

/// Runs one task per requested variation concurrently and aggregates the
/// outcomes.
///
/// Generic over `N: GenerationNotifier`. Use `Orchestrator::new()` for no-op
/// notifications or `Orchestrator::with_notifier()` to observe events.
pub struct Orchestrator<N: GenerationNotifier = NoopNotifier> {
  client: Arc<dyn GenerationClient>,
  poll_config: PollConfig,
  notifier: Arc<N>,
}

impl Orchestrator<NoopNotifier> {
  pub fn new(client: Arc<dyn GenerationClient>, poll_config: PollConfig) -> Self {
    Self::with_notifier(client, poll_config, NoopNotifier)
  }
}

impl<N: GenerationNotifier> Orchestrator<N> {
  pub fn with_notifier(client: Arc<dyn GenerationClient>, poll_config: PollConfig, notifier: N) -> Self {
    Self {
      client,
      poll_config,
      notifier: Arc::new(notifier),
    }
  }

  pub fn poll_config(&self) -> PollConfig {
    self.poll_config
  }

  /// Build one task per variation and run them all.
  ///
  /// Returns the sealed result unless every task failed, in which case the
  /// per-task failures are returned as [`PipelineError::AllTasksFailed`].
  #[instrument(
    name = "generation_run",
    skip(self, request, builder, cancel),
    fields(
      request_id = %request.request_id(),
      media = %request.media().describe(),
      variations = request.variations().len(),
    )
  )]
  pub async fn run<B: PromptBuilder + ?Sized>(
    &self,
    request: GenerationRequest,
    builder: &B,
    cancel: CancellationToken,
  ) -> Result<GenerationResult, PipelineError> {
    validate_variations(request.variations())?;

    // Build every plan before launching anything.
    let mut tasks = Vec::with_capacity(request.variations().len());
    for variation in request.variations() {
      let plan = builder
        .build(&request, variation)
        .map_err(|source| PipelineError::PromptBuild {
          variation: variation.clone(),
          source,
        })?;
      tasks.push(GenerationTask::new(variation.clone(), plan));
    }

    self.execute(&request, tasks, cancel).await
  }

  /// Run a single task with an explicit plan, bypassing the prompt builder.
  ///
  /// The request must name exactly one variation, which becomes the task
  /// name. Used by use cases that are one provider call (e.g.
  /// transcription). The same fallback and aggregation rules apply.
  #[instrument(
    name = "generation_run_single",
    skip(self, request, plan, cancel),
    fields(request_id = %request.request_id(), capability = %plan.capability)
  )]
  pub async fn run_single(
    &self,
    request: GenerationRequest,
    plan: TaskPlan,
    cancel: CancellationToken,
  ) -> Result<GenerationResult, PipelineError> {
    let name = match request.variations() {
      [name] => name.clone(),
      other => {
        return Err(PipelineError::InvalidRequest {
          message: format!("single-task run needs exactly one variation, got {}", other.len()),
        });
      }
    };

    let task = GenerationTask::new(name, plan);
    self.execute(&request, vec![task], cancel).await
  }

  async fn execute(
    &self,
    request: &GenerationRequest,
    tasks: Vec<GenerationTask>,
    cancel: CancellationToken,
  ) -> Result<GenerationResult, PipelineError> {
    let request_id = request.request_id().to_string();
    let names: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();

    info!(tasks = ?names, "run_started");
    self.notifier.notify(GenerationEvent::RunStarted {
      request_id: request_id.clone(),
      tasks: names.clone(),
    });

    let executor = TaskExecutor::new(
      Arc::clone(&self.client),
      Poller::new(Arc::clone(&self.client), self.poll_config),
      Arc::clone(&self.notifier),
    );

    let handles: Vec<_> = tasks
      .into_iter()
      .map(|task| {
        let executor = executor.clone();
        let ctx = TaskContext {
          request_id: request_id.clone(),
          media: request.shared_media(),
        };
        let cancel = cancel.child_token();
        tokio::spawn(async move { executor.execute(task, ctx, cancel).await })
      })
      .collect();

    // join_all yields in spawn order, whatever order tasks finish in.
    // Cancellation is checked first so a run whose tasks settled as cancelled
    // still reports Cancelled.
    let joined = tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!("run_cancelled");
        self.notifier.notify(GenerationEvent::RunFailed {
          request_id: request_id.clone(),
          error: PipelineError::Cancelled.to_string(),
        });
        return Err(PipelineError::Cancelled);
      }
      joined = futures::future::join_all(handles) => joined,
    };

    let mut slots = ResultSlots::new(request_id.clone(), names);
    for (index, joined) in joined.into_iter().enumerate() {
      let outcome = joined.unwrap_or_else(|e| {
        error!(task = slots.name(index), error = %e, "task_join_failed");
        TaskOutcome::failed(
          slots.name(index),
          TaskError::Join {
            message: e.to_string(),
          },
          0,
        )
      });
      slots.fill(index, outcome);
    }

    let result = slots.seal();

    match result.overall_status() {
      OverallStatus::AllFailed => {
        let err = PipelineError::AllTasksFailed {
          failures: result.failures(),
        };
        error!(error = %err, details = err.details().as_deref().unwrap_or(""), "run_failed");
        self.notifier.notify(GenerationEvent::RunFailed {
          request_id,
          error: err.to_string(),
        });
        Err(err)
      }
      status => {
        info!(status = ?status, "run_completed");
        self.notifier.notify(GenerationEvent::RunCompleted { request_id, status });
        Ok(result)
      }
    }
  }
}

fn validate_variations(variations: &[String]) -> Result<(), PipelineError> {
  if variations.is_empty() {
    return Err(PipelineError::InvalidRequest {
      message: "at least one variation is required".to_string(),
    });
  }

  let mut seen = HashSet::new();
  for variation in variations {
    if !seen.insert(variation.as_str()) {
      return Err(PipelineError::InvalidRequest {
        message: format!("duplicate variation '{}'", variation),
      });
    }
  }

  Ok(())
}
