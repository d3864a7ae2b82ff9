use std::sync::Arc;

use artisan_pipeline::Orchestrator;
use tokio_util::sync::CancellationToken;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
  orchestrator: Arc<Orchestrator>,
  shutdown: CancellationToken,
}

impl AppState {
  /// `shutdown` cancels every in-flight run when triggered.
  pub fn new(orchestrator: Arc<Orchestrator>, shutdown: CancellationToken) -> Self {
    Self {
      orchestrator,
      shutdown,
    }
  }

  pub fn orchestrator(&self) -> &Orchestrator {
    &self.orchestrator
  }

  /// Token for one request's run.
  pub fn run_token(&self) -> CancellationToken {
    self.shutdown.child_token()
  }
}
