//! Request body parsing.
//!
//! Every flow endpoint takes either a JSON [`GenerateBody`] or a
//! `multipart/form-data` form. Form parts named `image` and `audio` are file
//! uploads; `params` is a JSON object; `variations` may repeat or be
//! comma-separated; any other text part is a parameter.

use artisan_flows::{Flow, MediaRequirement};
use artisan_pipeline::{MediaKind, MediaPayload};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use crate::error::ApiError;

/// Body accepted by every flow endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateBody {
  pub image_base64: Option<String>,
  pub image_mime_type: Option<String>,
  pub image_url: Option<String>,
  pub audio_base64: Option<String>,
  pub audio_mime_type: Option<String>,
  pub audio_url: Option<String>,
  pub params: serde_json::Map<String, serde_json::Value>,
  pub variations: Option<Vec<String>>,
  #[serde(skip)]
  pub image_upload: Option<Upload>,
  #[serde(skip)]
  pub audio_upload: Option<Upload>,
}

/// A file part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
  pub data: Bytes,
  pub mime_type: Option<String>,
}

/// Extracts a [`GenerateBody`] from JSON or multipart requests.
pub struct GenerateInput(pub GenerateBody);

impl<S: Send + Sync> FromRequest<S> for GenerateInput {
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let is_multipart = req
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|value| value.to_str().ok())
      .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
      let multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
      return GenerateBody::from_multipart(multipart).await.map(GenerateInput);
    }

    let Json(body) = Json::<GenerateBody>::from_request(req, state)
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(GenerateInput(body))
  }
}

impl GenerateBody {
  /// Read a multipart form.
  pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
    let mut body = GenerateBody::default();

    while let Some(field) = multipart
      .next_field()
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
      let name = field.name().unwrap_or_default().to_string();

      if name == "image" || name == "audio" {
        let mime_type = field
          .content_type()
          .filter(|mime| *mime != "application/octet-stream")
          .map(str::to_string);
        let data = field
          .bytes()
          .await
          .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if data.is_empty() {
          continue;
        }
        let upload = Some(Upload { data, mime_type });
        if name == "image" {
          body.image_upload = upload;
        } else {
          body.audio_upload = upload;
        }
        continue;
      }

      let value = field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
      body.set_field(&name, value)?;
    }

    Ok(body)
  }

  fn set_field(&mut self, name: &str, value: String) -> Result<(), ApiError> {
    match name {
      "image_base64" => self.image_base64 = Some(value),
      "image_mime_type" => self.image_mime_type = Some(value),
      "image_url" => self.image_url = Some(value),
      "audio_base64" => self.audio_base64 = Some(value),
      "audio_mime_type" => self.audio_mime_type = Some(value),
      "audio_url" => self.audio_url = Some(value),
      "variations" => self.variations.get_or_insert_with(Vec::new).extend(
        value
          .split(',')
          .map(str::trim)
          .filter(|v| !v.is_empty())
          .map(str::to_string),
      ),
      "params" => {
        let params: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&value)
          .map_err(|e| ApiError::BadRequest(format!("invalid params: {}", e)))?;
        self.params.extend(params);
      }
      "" => {}
      other => {
        self
          .params
          .insert(other.to_string(), serde_json::Value::String(value));
      }
    }
    Ok(())
  }

  /// Pick the media the flow uses. An uploaded file wins over inline
  /// base64, which wins over a URL.
  pub fn media_for(&self, flow: Flow) -> Result<MediaPayload, ApiError> {
    let image = media(
      MediaKind::Image,
      self.image_upload.as_ref(),
      self.image_base64.as_deref(),
      self.image_mime_type.as_deref(),
      self.image_url.as_deref(),
    )?;
    let audio = media(
      MediaKind::Audio,
      self.audio_upload.as_ref(),
      self.audio_base64.as_deref(),
      self.audio_mime_type.as_deref(),
      self.audio_url.as_deref(),
    )?;

    let chosen = match flow.media() {
      MediaRequirement::Audio => audio,
      MediaRequirement::Image => image,
      MediaRequirement::ImageOrAudio | MediaRequirement::Optional => image.or(audio),
    };
    Ok(chosen.unwrap_or_default())
  }
}

fn default_mime_type(kind: MediaKind) -> &'static str {
  match kind {
    MediaKind::Image => "image/jpeg",
    MediaKind::Audio => "audio/webm",
  }
}

fn media(
  kind: MediaKind,
  upload: Option<&Upload>,
  base64: Option<&str>,
  mime_type: Option<&str>,
  url: Option<&str>,
) -> Result<Option<MediaPayload>, ApiError> {
  if let Some(upload) = upload {
    let mime_type = upload
      .mime_type
      .as_deref()
      .or(mime_type)
      .unwrap_or(default_mime_type(kind));
    return Ok(Some(MediaPayload::inline(kind, mime_type, upload.data.clone())));
  }

  if let Some(encoded) = base64.map(str::trim).filter(|s| !s.is_empty()) {
    let (data_url_mime, encoded) = split_data_url(encoded);
    let data = BASE64
      .decode(encoded)
      .map_err(|e| ApiError::BadRequest(format!("invalid {}_base64: {}", kind, e)))?;
    let mime_type = mime_type
      .or(data_url_mime)
      .unwrap_or(default_mime_type(kind));
    return Ok(Some(MediaPayload::inline(kind, mime_type, data)));
  }

  Ok(
    url
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|url| MediaPayload::reference(kind, url, mime_type.map(str::to_string))),
  )
}

/// Split `data:{mime};base64,{data}` into its parts. Plain base64 passes
/// through.
fn split_data_url(value: &str) -> (Option<&str>, &str) {
  value
    .strip_prefix("data:")
    .and_then(|rest| rest.split_once(','))
    .map(|(header, data)| (header.strip_suffix(";base64").filter(|m| !m.is_empty()), data))
    .unwrap_or((None, value))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_split_data_url() {
    assert_eq!(split_data_url("data:image/png;base64,AQID"), (Some("image/png"), "AQID"));
    assert_eq!(split_data_url("AQID"), (None, "AQID"));
  }

  #[test]
  fn test_inline_wins_over_url() {
    let body = GenerateBody {
      image_base64: Some("data:image/png;base64,AQID".to_string()),
      image_url: Some("https://blob/x.jpg".to_string()),
      ..Default::default()
    };
    let media = body.media_for(Flow::EnhanceImage).unwrap();
    assert_eq!(
      media,
      MediaPayload::inline(MediaKind::Image, "image/png", vec![1u8, 2, 3])
    );
  }

  #[test]
  fn test_transcribe_uses_audio() {
    let body = GenerateBody {
      image_url: Some("https://blob/x.jpg".to_string()),
      audio_url: Some("https://blob/a.webm".to_string()),
      audio_mime_type: Some("audio/webm".to_string()),
      ..Default::default()
    };
    assert_eq!(body.media_for(Flow::Transcribe).unwrap().kind(), Some(MediaKind::Audio));
    assert_eq!(body.media_for(Flow::ProductDetails).unwrap().kind(), Some(MediaKind::Image));
  }

  #[test]
  fn test_invalid_base64() {
    let body = GenerateBody {
      audio_base64: Some("not base64!".to_string()),
      ..Default::default()
    };
    assert!(matches!(
      body.media_for(Flow::Transcribe),
      Err(ApiError::BadRequest(message)) if message.starts_with("invalid audio_base64")
    ));
  }

  #[test]
  fn test_upload_wins_over_base64() {
    let body = GenerateBody {
      image_base64: Some("AQID".to_string()),
      image_upload: Some(Upload {
        data: Bytes::from_static(b"png"),
        mime_type: Some("image/png".to_string()),
      }),
      ..Default::default()
    };
    assert_eq!(
      body.media_for(Flow::FestivalCampaign).unwrap(),
      MediaPayload::inline(MediaKind::Image, "image/png", b"png".to_vec())
    );
  }

  #[test]
  fn test_form_fields() {
    let mut body = GenerateBody::default();
    body.set_field("festival", "Diwali".to_string()).unwrap();
    body.set_field("params", r#"{"hours": 5}"#.to_string()).unwrap();
    body.set_field("variations", "caption, hashtags".to_string()).unwrap();
    body.set_field("variations", "promo_video".to_string()).unwrap();
    body.set_field("audio_url", "https://blob/a.webm".to_string()).unwrap();

    assert_eq!(body.params["festival"], "Diwali");
    assert_eq!(body.params["hours"], 5);
    assert_eq!(
      body.variations,
      Some(vec!["caption".to_string(), "hashtags".to_string(), "promo_video".to_string()])
    );
    assert_eq!(body.audio_url.as_deref(), Some("https://blob/a.webm"));
    assert!(matches!(
      body.set_field("params", "[1]".to_string()),
      Err(ApiError::BadRequest(message)) if message.starts_with("invalid params")
    ));
  }

  #[test]
  fn test_no_media() {
    let body = GenerateBody::default();
    assert!(body.media_for(Flow::Pricing).unwrap().is_none());
  }
}
