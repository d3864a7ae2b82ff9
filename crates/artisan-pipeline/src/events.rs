//! Generation events and notifiers.
//!
//! Events let callers observe a run as it progresses: log it, stream it to a
//! client, or ignore it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::OverallStatus;
use crate::task::{Capability, TaskStatus};

/// Events emitted while a request is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
  /// Tasks are about to be launched.
  RunStarted {
    request_id: String,
    tasks: Vec<String>,
  },

  TaskStarted {
    request_id: String,
    task: String,
    capability: Capability,
  },

  /// The primary attempt failed and the fallback prompt is being tried.
  TaskFallback {
    request_id: String,
    task: String,
    error: String,
  },

  TaskSucceeded {
    request_id: String,
    task: String,
    status: TaskStatus,
  },

  TaskFailed {
    request_id: String,
    task: String,
    error: String,
  },

  /// A status query for a long-running operation returned.
  PollProgress {
    request_id: String,
    task: String,
    attempt: u32,
    done: bool,
  },

  /// Every task settled and at least one succeeded.
  RunCompleted {
    request_id: String,
    status: OverallStatus,
  },

  RunFailed { request_id: String, error: String },
}

impl GenerationEvent {
  pub fn request_id(&self) -> &str {
    match self {
      GenerationEvent::RunStarted { request_id, .. }
      | GenerationEvent::TaskStarted { request_id, .. }
      | GenerationEvent::TaskFallback { request_id, .. }
      | GenerationEvent::TaskSucceeded { request_id, .. }
      | GenerationEvent::TaskFailed { request_id, .. }
      | GenerationEvent::PollProgress { request_id, .. }
      | GenerationEvent::RunCompleted { request_id, .. }
      | GenerationEvent::RunFailed { request_id, .. } => request_id,
    }
  }
}

/// Receives generation events.
///
/// Called from spawned tasks, so implementations must not block.
pub trait GenerationNotifier: Send + Sync + 'static {
  fn notify(&self, event: GenerationEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl GenerationNotifier for NoopNotifier {
  fn notify(&self, _event: GenerationEvent) {}
}

/// Sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a task; volume is a handful of
  // events per task plus one per status query.
  sender: mpsc::UnboundedSender<GenerationEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<GenerationEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<GenerationEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl GenerationNotifier for ChannelNotifier {
  fn notify(&self, event: GenerationEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
