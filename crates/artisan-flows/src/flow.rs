use std::fmt;
use std::str::FromStr;

use artisan_pipeline::{
  Capability, GenerationNotifier, GenerationRequest, GenerationResult, MediaKind, MediaPayload,
  Orchestrator, PipelineError, PromptBuilder, TemplatePromptBuilder,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::FlowError;
use crate::prompts;

/// Media a flow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRequirement {
  /// Media is used when present.
  Optional,
  Image,
  Audio,
  ImageOrAudio,
}

impl MediaRequirement {
  pub fn accepts(&self, media: &MediaPayload) -> bool {
    match (self, media.kind()) {
      (MediaRequirement::Optional, _) => true,
      (MediaRequirement::Image, Some(MediaKind::Image)) => true,
      (MediaRequirement::Audio, Some(MediaKind::Audio)) => true,
      (MediaRequirement::ImageOrAudio, Some(_)) => true,
      _ => false,
    }
  }

  fn describe(&self) -> &'static str {
    match self {
      MediaRequirement::Optional => "optional",
      MediaRequirement::Image => "image",
      MediaRequirement::Audio => "audio",
      MediaRequirement::ImageOrAudio => "image or audio",
    }
  }
}

/// An artisan use case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
  EnhanceImage,
  FestivalImages,
  FestivalVideo,
  FestivalCampaign,
  ProductDetails,
  Pricing,
  Transcribe,
}

impl Flow {
  pub const ALL: [Flow; 7] = [
    Flow::EnhanceImage,
    Flow::FestivalImages,
    Flow::FestivalVideo,
    Flow::FestivalCampaign,
    Flow::ProductDetails,
    Flow::Pricing,
    Flow::Transcribe,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Flow::EnhanceImage => "enhance-image",
      Flow::FestivalImages => "festival-images",
      Flow::FestivalVideo => "festival-video",
      Flow::FestivalCampaign => "festival-campaign",
      Flow::ProductDetails => "product-details",
      Flow::Pricing => "pricing",
      Flow::Transcribe => "transcribe",
    }
  }

  /// Variations run when the caller does not choose, in result order.
  pub fn variations(&self) -> &'static [&'static str] {
    match self {
      Flow::EnhanceImage => &["natural", "white_background", "high_resolution"],
      Flow::FestivalImages => &["traditional", "modern", "social_square"],
      Flow::FestivalVideo => &["promo_video"],
      Flow::FestivalCampaign => &[
        "campaign_image",
        "social_square",
        "caption",
        "hashtags",
        "promo_video",
      ],
      Flow::ProductDetails => &["description", "caption", "hashtags"],
      Flow::Pricing => &["pricing"],
      Flow::Transcribe => &["transcript"],
    }
  }

  pub fn required_params(&self) -> &'static [&'static str] {
    match self {
      Flow::FestivalImages | Flow::FestivalVideo | Flow::FestivalCampaign => &["festival"],
      Flow::ProductDetails => &["language", "platform"],
      Flow::Pricing => &["material", "hours"],
      Flow::EnhanceImage | Flow::Transcribe => &[],
    }
  }

  pub fn media(&self) -> MediaRequirement {
    match self {
      Flow::EnhanceImage | Flow::FestivalImages | Flow::FestivalCampaign => MediaRequirement::Image,
      Flow::ProductDetails => MediaRequirement::ImageOrAudio,
      Flow::Transcribe => MediaRequirement::Audio,
      Flow::FestivalVideo | Flow::Pricing => MediaRequirement::Optional,
    }
  }

  /// Capability of one of the flow's variations. Most flows use a single
  /// capability; the festival campaign mixes images, text and video.
  pub fn capability(&self, variation: &str) -> Option<Capability> {
    self
      .prompt_builder()
      .template(variation)
      .map(|template| template.capability)
  }

  /// Flows that are a single provider call rather than a set of variations.
  pub fn is_single(&self) -> bool {
    matches!(self, Flow::Transcribe)
  }

  pub fn prompt_builder(&self) -> TemplatePromptBuilder {
    prompts::builder(*self)
  }

  /// Validate caller input and build the request.
  ///
  /// `variations` of `None` or empty selects the flow's defaults; otherwise
  /// each must be one of [`Flow::variations`].
  pub fn prepare(
    &self,
    media: MediaPayload,
    params: serde_json::Map<String, serde_json::Value>,
    variations: Option<Vec<String>>,
  ) -> Result<GenerationRequest, FlowError> {
    for param in self.required_params() {
      if !has_param(&params, param) {
        return Err(FlowError::MissingParam {
          flow: self.name().to_string(),
          param: param.to_string(),
        });
      }
    }

    let requirement = self.media();
    if !requirement.accepts(&media) {
      return Err(FlowError::MissingMedia {
        flow: self.name().to_string(),
        expected: requirement.describe().to_string(),
      });
    }

    let variations = match variations {
      Some(chosen) if !chosen.is_empty() => {
        if let Some(unknown) = chosen
          .iter()
          .find(|v| !self.variations().contains(&v.as_str()))
        {
          return Err(FlowError::UnknownVariation {
            flow: self.name().to_string(),
            variation: unknown.clone(),
          });
        }
        chosen
      }
      _ => self.variations().iter().map(|v| v.to_string()).collect(),
    };

    Ok(GenerationRequest::new(media, params, variations))
  }

  /// Run a prepared request through the orchestrator.
  pub async fn run<N: GenerationNotifier>(
    &self,
    orchestrator: &Orchestrator<N>,
    request: GenerationRequest,
    cancel: CancellationToken,
  ) -> Result<GenerationResult, PipelineError> {
    info!(
      flow = self.name(),
      request_id = request.request_id(),
      "flow_started"
    );
    let builder = self.prompt_builder();

    if let (true, [name]) = (self.is_single(), request.variations()) {
      let plan = builder
        .build(&request, name)
        .map_err(|source| PipelineError::PromptBuild {
          variation: name.clone(),
          source,
        })?;
      return orchestrator.run_single(request, plan, cancel).await;
    }

    orchestrator.run(request, &builder, cancel).await
  }
}

fn has_param(params: &serde_json::Map<String, serde_json::Value>, key: &str) -> bool {
  match params.get(key) {
    None | Some(serde_json::Value::Null) => false,
    Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
    Some(_) => true,
  }
}

impl fmt::Display for Flow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Flow {
  type Err = FlowError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Flow::ALL
      .into_iter()
      .find(|flow| flow.name() == s)
      .ok_or_else(|| FlowError::UnknownFlow {
        name: s.to_string(),
      })
  }
}
