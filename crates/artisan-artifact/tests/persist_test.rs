//! Persisting a finished run to a filesystem store.

use std::sync::Arc;

use artisan_artifact::{FsStore, Store, persist_result, read_all};
use artisan_pipeline::{
  Capability, GenerationCall, GenerationClient, GenerationError, GenerationRequest, MediaPayload,
  Orchestrator, PollConfig, PromptError, TaskPayload, TaskPlan,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

struct FixedClient;

#[async_trait]
impl GenerationClient for FixedClient {
  async fn generate_immediate(&self, call: &GenerationCall<'_>) -> Result<TaskPayload, GenerationError> {
    match call.prompt {
      "image" => Ok(json!({ "kind": "image", "mime_type": "image/png", "data": "cG5n" })),
      "text" => Ok(json!({ "kind": "text", "text": "a fine pot" })),
      _ => Err(GenerationError::SafetyRejected {
        reason: "SAFETY".to_string(),
      }),
    }
  }
}

#[tokio::test]
async fn test_persist_successful_outcomes_and_summary() {
  let dir = tempfile::tempdir().unwrap();
  let store = FsStore::new(dir.path());

  let builder = |_: &GenerationRequest, variation: &str| -> Result<TaskPlan, PromptError> {
    let capability = if variation == "photo" {
      Capability::Image
    } else {
      Capability::Text
    };
    let prompt = match variation {
      "photo" => "image",
      "caption" => "text",
      _ => "blocked",
    };
    Ok(TaskPlan::new(capability, prompt))
  };

  let request = GenerationRequest::new(
    MediaPayload::None,
    Default::default(),
    vec!["photo".to_string(), "caption".to_string(), "hashtags".to_string()],
  )
  .with_request_id("pot-9");

  let result = Orchestrator::new(Arc::new(FixedClient), PollConfig::default())
    .run(request, &builder, CancellationToken::new())
    .await
    .unwrap();

  let keys = persist_result(&store, &result).await.unwrap();
  assert_eq!(keys, vec!["pot-9/photo.png", "pot-9/caption.txt", "pot-9/result.json"]);

  let photo = read_all(store.get("pot-9/photo.png").await.unwrap()).await.unwrap();
  assert_eq!(&photo[..], b"png");

  let summary = read_all(store.get("pot-9/result.json").await.unwrap()).await.unwrap();
  let summary: Value = serde_json::from_slice(&summary).unwrap();
  assert_eq!(summary["request_id"], "pot-9");
  assert_eq!(summary["overall_status"], "partial_success");
  assert_eq!(summary["outcomes"][2]["status"], "failed");
  assert_eq!(
    summary["outcomes"][2]["error"],
    "content rejected by provider safety filters: SAFETY"
  );
}
