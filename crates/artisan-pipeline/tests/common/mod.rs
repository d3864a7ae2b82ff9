//! Scripted generation client shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use artisan_pipeline::{
  GenerationCall, GenerationClient, GenerationError, OperationHandle, OperationStatus, TaskPayload,
};
use async_trait::async_trait;

#[derive(Clone)]
struct Script {
  delay: Duration,
  result: Result<TaskPayload, GenerationError>,
}

/// Answers by prompt text. Unscripted prompts fail with a transport error.
#[derive(Default)]
pub struct ScriptedClient {
  scripts: HashMap<String, Script>,
  statuses: Mutex<VecDeque<Result<OperationStatus, GenerationError>>>,
  calls: Mutex<Vec<String>>,
  status_calls: Mutex<u32>,
}

impl ScriptedClient {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn succeed(self, prompt: &str, payload: TaskPayload) -> Self {
    self.succeed_after(prompt, Duration::ZERO, payload)
  }

  pub fn succeed_after(mut self, prompt: &str, delay: Duration, payload: TaskPayload) -> Self {
    self.scripts.insert(
      prompt.to_string(),
      Script {
        delay,
        result: Ok(payload),
      },
    );
    self
  }

  pub fn fail(mut self, prompt: &str, error: GenerationError) -> Self {
    self.scripts.insert(
      prompt.to_string(),
      Script {
        delay: Duration::ZERO,
        result: Err(error),
      },
    );
    self
  }

  /// Status answers returned in order; once exhausted, every query is pending.
  pub fn with_statuses(self, statuses: Vec<OperationStatus>) -> Self {
    *self.statuses.lock().unwrap() = statuses.into_iter().map(Ok).collect();
    self
  }

  pub fn with_status_results(self, statuses: Vec<Result<OperationStatus, GenerationError>>) -> Self {
    *self.statuses.lock().unwrap() = statuses.into_iter().collect();
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self, prompt: &str) -> usize {
    self.calls.lock().unwrap().iter().filter(|p| *p == prompt).count()
  }

  pub fn status_calls(&self) -> u32 {
    *self.status_calls.lock().unwrap()
  }

  async fn answer(&self, prompt: &str) -> Result<TaskPayload, GenerationError> {
    self.calls.lock().unwrap().push(prompt.to_string());
    let script = self.scripts.get(prompt).cloned();
    match script {
      Some(script) => {
        if !script.delay.is_zero() {
          tokio::time::sleep(script.delay).await;
        }
        script.result
      }
      None => Err(GenerationError::Transport {
        message: format!("unscripted prompt '{}'", prompt),
      }),
    }
  }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
  async fn generate_immediate(&self, call: &GenerationCall<'_>) -> Result<TaskPayload, GenerationError> {
    self.answer(call.prompt).await
  }

  async fn generate_async(&self, call: &GenerationCall<'_>) -> Result<OperationHandle, GenerationError> {
    self.answer(call.prompt).await.map(|payload| {
      let name = payload
        .get("operation")
        .and_then(|v| v.as_str())
        .unwrap_or("operations/test")
        .to_string();
      OperationHandle::new(name)
    })
  }

  async fn check_status(&self, _handle: &OperationHandle) -> Result<OperationStatus, GenerationError> {
    *self.status_calls.lock().unwrap() += 1;
    self
      .statuses
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Ok(OperationStatus::pending()))
  }
}

/// Status sequence: `pending` pending answers, then a completed one.
pub fn done_after(pending: usize, response: TaskPayload) -> Vec<OperationStatus> {
  let mut statuses = vec![OperationStatus::pending(); pending];
  statuses.push(OperationStatus::completed(response));
  statuses
}

pub fn http_error(status: u16) -> GenerationError {
  GenerationError::Http {
    status,
    body: "upstream error".to_string(),
  }
}
