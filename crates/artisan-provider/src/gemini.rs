//! Gemini `generateContent` request bodies and response parsing.

use artisan_pipeline::{Capability, GenerationError, MediaKind, MediaPayload, TaskPayload};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

/// Finish reasons that mean the output was withheld.
const BLOCKING_FINISH_REASONS: &[&str] = &[
  "SAFETY",
  "PROHIBITED_CONTENT",
  "BLOCKLIST",
  "SPII",
  "IMAGE_SAFETY",
];

/// Endpoint for a model, accepting both `name` and `models/name`.
pub(crate) fn endpoint(base_url: &str, model: &str) -> String {
  let model = model.trim();
  let model_path = if model.starts_with("models/") {
    model.to_string()
  } else {
    format!("models/{}", model)
  };
  format!("{}/{}:generateContent", base_url.trim_end_matches('/'), model_path)
}

/// Build the request body: the media part (if any) followed by the prompt.
pub(crate) fn request_body(prompt: &str, capability: Capability, media: &MediaPayload) -> Value {
  let mut parts = Vec::new();
  if let Some(part) = media_part(media) {
    parts.push(part);
  }
  parts.push(json!({ "text": prompt }));

  let mut body = json!({
    "contents": [{ "role": "user", "parts": parts }],
  });

  if capability == Capability::Image {
    body["generationConfig"] = json!({ "responseModalities": ["TEXT", "IMAGE"] });
  }

  body
}

fn media_part(media: &MediaPayload) -> Option<Value> {
  match media {
    MediaPayload::None => None,
    MediaPayload::Inline {
      mime_type, data, ..
    } => Some(json!({
      "inline_data": {
        "mime_type": mime_type,
        "data": BASE64.encode(data),
      }
    })),
    MediaPayload::Reference {
      kind,
      mime_type,
      url,
    } => Some(json!({
      "file_data": {
        "mime_type": mime_type.clone().unwrap_or_else(|| default_mime_type(*kind).to_string()),
        "file_uri": url,
      }
    })),
  }
}

pub(crate) fn default_mime_type(kind: MediaKind) -> &'static str {
  match kind {
    MediaKind::Image => "image/jpeg",
    MediaKind::Audio => "audio/webm",
  }
}

/// Turn a `generateContent` response into a task payload.
///
/// Text tasks yield `{"kind": "text", "text"}`. Image tasks yield
/// `{"kind": "image", "mime_type", "data"}` with base64 data, plus any text
/// the model returned alongside.
pub(crate) fn parse_response(capability: Capability, body: &Value) -> Result<TaskPayload, GenerationError> {
  if let Some(reason) = body
    .pointer("/promptFeedback/blockReason")
    .and_then(Value::as_str)
  {
    return Err(GenerationError::SafetyRejected {
      reason: reason.to_string(),
    });
  }

  let candidate = body
    .get("candidates")
    .and_then(Value::as_array)
    .and_then(|candidates| candidates.first())
    .ok_or_else(|| malformed("response has no candidates"))?;

  if let Some(reason) = candidate
    .get("finishReason")
    .and_then(Value::as_str)
    .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
  {
    return Err(GenerationError::SafetyRejected {
      reason: reason.to_string(),
    });
  }

  let parts = candidate
    .pointer("/content/parts")
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default();

  let text: String = parts
    .iter()
    .filter_map(|part| part.get("text").and_then(Value::as_str))
    .collect::<Vec<_>>()
    .join("");

  match capability {
    Capability::Image => {
      let inline = parts
        .iter()
        .filter_map(|part| part.get("inlineData").or_else(|| part.get("inline_data")))
        .find(|inline| {
          inline
            .get("data")
            .and_then(Value::as_str)
            .is_some_and(|data| !data.is_empty())
        })
        .ok_or_else(|| malformed("response contains no image"))?;

      let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
      let mime_type = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str)
        .unwrap_or("image/png");

      let mut payload = json!({
        "kind": "image",
        "mime_type": mime_type,
        "data": data,
      });
      if !text.trim().is_empty() {
        payload["text"] = Value::String(text.trim().to_string());
      }
      Ok(payload)
    }
    _ => {
      if text.trim().is_empty() {
        return Err(malformed("response contains no text"));
      }
      Ok(json!({ "kind": "text", "text": text.trim() }))
    }
  }
}

fn malformed(message: &str) -> GenerationError {
  GenerationError::MalformedPayload {
    message: message.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_endpoint() {
    assert_eq!(
      endpoint("https://example.test/v1beta/", "gemini-2.0-flash"),
      "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
    );
    assert_eq!(
      endpoint("https://example.test/v1beta", "models/gemini-2.0-flash"),
      "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
    );
  }

  #[test]
  fn test_request_body_inline_image() {
    let media = MediaPayload::inline(MediaKind::Image, "image/png", vec![1u8, 2, 3]);
    let body = request_body("enhance", Capability::Image, &media);

    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["inline_data"]["mime_type"], "image/png");
    assert_eq!(parts[0]["inline_data"]["data"], "AQID");
    assert_eq!(parts[1]["text"], "enhance");
    assert_eq!(
      body["generationConfig"]["responseModalities"],
      json!(["TEXT", "IMAGE"])
    );
  }

  #[test]
  fn test_request_body_reference_audio() {
    let media = MediaPayload::reference(MediaKind::Audio, "gs://bucket/a.webm", None);
    let body = request_body("transcribe", Capability::Text, &media);

    let part = &body["contents"][0]["parts"][0];
    assert_eq!(part["file_data"]["file_uri"], "gs://bucket/a.webm");
    assert_eq!(part["file_data"]["mime_type"], "audio/webm");
    assert!(body.get("generationConfig").is_none());
  }

  #[test]
  fn test_request_body_text_only() {
    let body = request_body("price this", Capability::Text, &MediaPayload::None);
    assert_eq!(body["contents"][0]["parts"], json!([{ "text": "price this" }]));
  }

  #[test]
  fn test_parse_text() {
    let body = json!({
      "candidates": [{
        "content": { "parts": [{ "text": "Hand-woven " }, { "text": "silk saree." }] },
        "finishReason": "STOP"
      }]
    });
    let payload = parse_response(Capability::Text, &body).unwrap();
    assert_eq!(payload, json!({ "kind": "text", "text": "Hand-woven silk saree." }));
  }

  #[test]
  fn test_parse_image() {
    let body = json!({
      "candidates": [{
        "content": { "parts": [
          { "text": "Here is your image" },
          { "inlineData": { "mimeType": "image/png", "data": "iVBORw0K" } }
        ] }
      }]
    });
    let payload = parse_response(Capability::Image, &body).unwrap();
    assert_eq!(payload["kind"], "image");
    assert_eq!(payload["mime_type"], "image/png");
    assert_eq!(payload["data"], "iVBORw0K");
    assert_eq!(payload["text"], "Here is your image");
  }

  #[test]
  fn test_parse_image_missing() {
    let body = json!({
      "candidates": [{ "content": { "parts": [{ "text": "I cannot do that" }] } }]
    });
    assert!(matches!(
      parse_response(Capability::Image, &body),
      Err(GenerationError::MalformedPayload { .. })
    ));
  }

  #[test]
  fn test_parse_blocked_prompt() {
    let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
    assert_eq!(
      parse_response(Capability::Text, &body).unwrap_err(),
      GenerationError::SafetyRejected {
        reason: "SAFETY".to_string()
      }
    );
  }

  #[test]
  fn test_parse_blocked_finish_reason() {
    let body = json!({
      "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
    });
    assert!(matches!(
      parse_response(Capability::Image, &body),
      Err(GenerationError::SafetyRejected { reason }) if reason == "IMAGE_SAFETY"
    ));
  }

  #[test]
  fn test_parse_no_candidates() {
    assert!(matches!(
      parse_response(Capability::Text, &json!({ "candidates": [] })),
      Err(GenerationError::MalformedPayload { .. })
    ));
  }
}
