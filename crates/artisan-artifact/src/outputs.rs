use artisan_pipeline::{GenerationResult, TaskOutcome};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde_json::Value;
use tracing::info;

use crate::{Error, Store, single_chunk};

/// A stored form of one task's output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
  pub key: String,
  pub content_type: String,
  pub data: Bytes,
}

fn extension(content_type: &str) -> &'static str {
  match content_type {
    "image/png" => "png",
    "image/jpeg" | "image/jpg" => "jpg",
    "image/webp" => "webp",
    "video/mp4" => "mp4",
    "text/plain" => "txt",
    "text/uri-list" => "uri",
    "application/json" => "json",
    _ => "bin",
  }
}

fn decode(key: &str, data: &str) -> Result<Bytes, Error> {
  BASE64
    .decode(data.as_bytes())
    .map(Bytes::from)
    .map_err(|source| Error::Decode {
      key: key.to_string(),
      source,
    })
}

/// Convert a successful outcome into an artifact keyed
/// `{request_id}/{task}.{ext}`.
///
/// Image payloads are decoded from base64 and text payloads stored as plain
/// text. Video payloads store the first video's bytes, or its storage URI
/// when the provider only returned a reference. Anything else is stored as
/// JSON. Failed outcomes have no artifact.
pub fn outcome_artifact(request_id: &str, outcome: &TaskOutcome) -> Result<Option<OutputArtifact>, Error> {
  let Some(payload) = &outcome.payload else {
    return Ok(None);
  };

  let artifact = |content_type: &str, data: Bytes| OutputArtifact {
    key: format!("{}/{}.{}", request_id, outcome.name, extension(content_type)),
    content_type: content_type.to_string(),
    data,
  };

  let stored = match payload.get("kind").and_then(Value::as_str) {
    Some("image") if payload.get("data").is_some_and(Value::is_string) => {
      let data = payload.get("data").and_then(Value::as_str).unwrap_or_default();
      let content_type = payload
        .get("mime_type")
        .and_then(Value::as_str)
        .unwrap_or("image/png");
      artifact(content_type, decode(&outcome.name, data)?)
    }
    Some("text") => {
      let text = payload.get("text").and_then(Value::as_str).unwrap_or_default();
      artifact("text/plain", Bytes::from(text.to_string()))
    }
    Some("video") => match video_output(payload) {
      Some(VideoOutput::Inline { data, mime_type }) => {
        artifact(mime_type, decode(&outcome.name, data)?)
      }
      Some(VideoOutput::Uri(uri)) => artifact("text/uri-list", Bytes::from(format!("{}\n", uri))),
      None => json_artifact(payload, artifact)?,
    },
    _ => json_artifact(payload, artifact)?,
  };

  Ok(Some(stored))
}

enum VideoOutput<'a> {
  Inline { data: &'a str, mime_type: &'a str },
  Uri(&'a str),
}

fn video_output(payload: &Value) -> Option<VideoOutput<'_>> {
  let video = payload.pointer("/videos/0")?;
  if let Some(data) = video.get("bytesBase64Encoded").and_then(Value::as_str) {
    let mime_type = video
      .get("mimeType")
      .and_then(Value::as_str)
      .unwrap_or("video/mp4");
    return Some(VideoOutput::Inline { data, mime_type });
  }
  video
    .get("gcsUri")
    .or_else(|| video.get("uri"))
    .and_then(Value::as_str)
    .map(VideoOutput::Uri)
}

fn json_artifact(
  payload: &Value,
  artifact: impl Fn(&str, Bytes) -> OutputArtifact,
) -> Result<OutputArtifact, Error> {
  Ok(artifact(
    "application/json",
    Bytes::from(serde_json::to_vec_pretty(payload)?),
  ))
}

/// Store every successful outcome, then `{request_id}/result.json`.
///
/// Returns the keys written, result last.
pub async fn persist_result(store: &dyn Store, result: &GenerationResult) -> Result<Vec<String>, Error> {
  let mut keys = Vec::new();

  for outcome in result.outcomes() {
    if let Some(artifact) = outcome_artifact(result.request_id(), outcome)? {
      store
        .put(&artifact.key, single_chunk(artifact.data), &artifact.content_type)
        .await?;
      keys.push(artifact.key);
    }
  }

  let key = format!("{}/result.json", result.request_id());
  let summary = serde_json::to_vec_pretty(result)?;
  store.put(&key, single_chunk(summary), "application/json").await?;
  keys.push(key);

  info!(
    request_id = result.request_id(),
    artifacts = keys.len(),
    "result_persisted"
  );
  Ok(keys)
}

#[cfg(test)]
mod tests {
  use super::*;
  use artisan_pipeline::{TaskError, TaskStatus};
  use serde_json::json;

  fn ok(name: &str, payload: Value) -> TaskOutcome {
    TaskOutcome::succeeded(name, TaskStatus::Succeeded, payload, 1)
  }

  #[test]
  fn test_image_payload_is_decoded() {
    let outcome = ok(
      "natural",
      json!({ "kind": "image", "mime_type": "image/jpeg", "data": "aW1n" }),
    );
    let artifact = outcome_artifact("req-1", &outcome).unwrap().unwrap();
    assert_eq!(artifact.key, "req-1/natural.jpg");
    assert_eq!(artifact.content_type, "image/jpeg");
    assert_eq!(&artifact.data[..], b"img");
  }

  #[test]
  fn test_text_payload() {
    let outcome = ok("caption", json!({ "kind": "text", "text": "Handwoven with love" }));
    let artifact = outcome_artifact("req-1", &outcome).unwrap().unwrap();
    assert_eq!(artifact.key, "req-1/caption.txt");
    assert_eq!(&artifact.data[..], b"Handwoven with love");
  }

  #[test]
  fn test_inline_video_is_decoded() {
    let inline = ok(
      "promo_video",
      json!({
        "kind": "video",
        "videos": [{ "bytesBase64Encoded": "dmlk", "mimeType": "video/mp4" }]
      }),
    );
    let artifact = outcome_artifact("req-1", &inline).unwrap().unwrap();
    assert_eq!(artifact.key, "req-1/promo_video.mp4");
    assert_eq!(&artifact.data[..], b"vid");
  }

  #[test]
  fn test_referenced_video_stores_its_uri() {
    let referenced = ok(
      "promo_video",
      json!({ "kind": "video", "videos": [{ "gcsUri": "gs://b/v.mp4", "mimeType": "video/mp4" }] }),
    );
    let artifact = outcome_artifact("req-1", &referenced).unwrap().unwrap();
    assert_eq!(artifact.key, "req-1/promo_video.uri");
    assert_eq!(artifact.content_type, "text/uri-list");
    assert_eq!(&artifact.data[..], b"gs://b/v.mp4\n");
  }

  #[test]
  fn test_untagged_payload_is_json() {
    let untagged = ok("promo_video", json!({ "videos": [{ "gcsUri": "gs://b/v.mp4" }] }));
    let artifact = outcome_artifact("req-1", &untagged).unwrap().unwrap();
    assert_eq!(artifact.key, "req-1/promo_video.json");
    assert_eq!(artifact.content_type, "application/json");
  }

  #[test]
  fn test_failed_outcome_has_no_artifact() {
    let outcome = TaskOutcome::failed("natural", TaskError::EmptyResult, 2);
    assert!(outcome_artifact("req-1", &outcome).unwrap().is_none());
  }

  #[test]
  fn test_bad_base64() {
    let outcome = ok("natural", json!({ "kind": "image", "data": "%%%" }));
    assert!(matches!(
      outcome_artifact("req-1", &outcome),
      Err(Error::Decode { .. })
    ));
  }
}
