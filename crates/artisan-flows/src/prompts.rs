//! Prompt templates for every flow.
//!
//! Templates render against the request parameters plus `variation`.

use artisan_pipeline::{Capability, PromptTemplate, TemplatePromptBuilder};

use crate::flow::Flow;

const PRODUCT: &str =
  "{% if product_name %}the handcrafted product \"{{ product_name }}\"{% else %}this handcrafted product{% endif %}";

const TONE: &str = "{% if tone %} Use a {{ tone }} tone.{% endif %}";

const AUDIENCE: &str = "{% if audience %} The audience is {{ audience }}.{% endif %}";

fn image(primary: String, fallback: &str) -> PromptTemplate {
  PromptTemplate::new(Capability::Image, primary).with_fallback(fallback)
}

fn text(primary: String, fallback: String) -> PromptTemplate {
  PromptTemplate::new(Capability::Text, primary).with_fallback(fallback)
}

/// Templates for a flow.
pub(crate) fn builder(flow: Flow) -> TemplatePromptBuilder {
  match flow {
    Flow::EnhanceImage => enhance_image(),
    Flow::FestivalImages => festival_images(),
    Flow::FestivalVideo => festival_video(),
    Flow::FestivalCampaign => festival_campaign(),
    Flow::ProductDetails => product_details(),
    Flow::Pricing => pricing(),
    Flow::Transcribe => transcribe(),
  }
}

fn enhance_image() -> TemplatePromptBuilder {
  TemplatePromptBuilder::new()
    .with_template(
      "natural",
      image(
        format!(
          "Enhance this photo of {PRODUCT}. Improve lighting, color balance and sharpness \
           while keeping the product, its texture and its colors true to life. \
           Do not add or remove objects."
        ),
        "Improve the lighting and sharpness of this product photo without changing the product.",
      ),
    )
    .with_template(
      "white_background",
      image(
        format!(
          "Place {PRODUCT} on a clean, pure white studio background with soft, even \
           lighting and a subtle natural shadow. Keep the product exactly as it is."
        ),
        "Replace the background of this photo with plain white.",
      ),
    )
    .with_template(
      "high_resolution",
      image(
        format!(
          "Produce a high-resolution, detailed version of this photo of {PRODUCT}. \
           Sharpen fine details such as weave, grain and brush strokes without altering \
           the product."
        ),
        "Make this product photo sharper and more detailed.",
      ),
    )
}

fn festival_images() -> TemplatePromptBuilder {
  let styles = [
    (
      "traditional",
      "a traditional {{ festival }} setting with diyas, rangoli, marigolds and warm festive light",
    ),
    (
      "modern",
      "a modern, minimal {{ festival }} arrangement with clean lines and a contemporary palette",
    ),
    (
      "social_square",
      "a square 1:1 social media post celebrating {{ festival }}, with space for a short greeting",
    ),
  ];

  styles
    .into_iter()
    .fold(TemplatePromptBuilder::new(), |builder, (variation, scene)| {
      builder.with_template(
        variation,
        image(
          format!(
            "Create a festive marketing image showing {PRODUCT} in {scene}. \
             Keep the product clearly visible and faithful to the photo.{TONE}{AUDIENCE}"
          ),
          "Create a simple {{ festival }} themed image featuring this product.",
        ),
      )
    })
}

fn festival_video() -> TemplatePromptBuilder {
  TemplatePromptBuilder::new().with_template(
    "promo_video",
    PromptTemplate::new(
      Capability::Video,
      format!(
        "A short cinematic promotional video of {PRODUCT} for {{{{ festival }}}}. \
         Slow camera movement around the product, festive decorations and warm light, \
         celebrating handmade craftsmanship.{TONE}"
      ),
    )
    .with_fallback("A short festive video for {{ festival }} showing a handcrafted product."),
  )
}

const LANGUAGE: &str = "{% if language %} in {{ language }}{% endif %}";

/// One request covering a whole festival launch: hero and social images,
/// caption, hashtags and a promo video.
fn festival_campaign() -> TemplatePromptBuilder {
  TemplatePromptBuilder::new()
    .with_template(
      "campaign_image",
      image(
        format!(
          "Create a {{{{ festival }}}} campaign hero image showing {PRODUCT} in a rich \
           festive scene with decorations and warm light. Keep the product clearly visible \
           and faithful to the photo.{TONE}{AUDIENCE}"
        ),
        "Create a {{ festival }} themed image featuring this product.",
      ),
    )
    .with_template(
      "social_square",
      image(
        format!(
          "Create a square 1:1 social media post celebrating {{{{ festival }}}} with {PRODUCT} \
           as the focus and space for a short greeting.{TONE}"
        ),
        "Create a square {{ festival }} post featuring this product.",
      ),
    )
    .with_template(
      "caption",
      text(
        format!(
          "Write one engaging social media caption{LANGUAGE} announcing {PRODUCT} for \
           {{{{ festival }}}}.{TONE}{AUDIENCE} Return only the caption."
        ),
        "Write a short {{ festival }} caption for this handcrafted product.".to_string(),
      ),
    )
    .with_template(
      "hashtags",
      text(
        format!(
          "Suggest 10 hashtags for a {{{{ festival }}}} campaign promoting {PRODUCT}. \
           Return only the hashtags separated by spaces."
        ),
        "List 10 {{ festival }} hashtags for a handcrafted product.".to_string(),
      ),
    )
    .with_template(
      "promo_video",
      PromptTemplate::new(
        Capability::Video,
        format!(
          "A short cinematic {{{{ festival }}}} promotional video of {PRODUCT}, slow camera \
           movement, festive decorations and warm light.{TONE}"
        ),
      )
      .with_fallback("A short festive video for {{ festival }} showing a handcrafted product."),
    )
}

fn product_details() -> TemplatePromptBuilder {
  let source = "Use the attached product photo or the artisan's voice note as the source.";

  TemplatePromptBuilder::new()
    .with_template(
      "description",
      text(
        format!(
          "{source} Write a product description of {PRODUCT} for {{{{ platform }}}} in \
           {{{{ language }}}}. Cover the material, the craft technique and what makes it \
           special, in two short paragraphs.{TONE}{AUDIENCE} Return only the description."
        ),
        "Describe this handcrafted product in {{ language }} in a few sentences.".to_string(),
      ),
    )
    .with_template(
      "caption",
      text(
        format!(
          "{source} Write one engaging {{{{ platform }}}} caption in {{{{ language }}}} for \
           {PRODUCT}.{TONE}{AUDIENCE} Return only the caption."
        ),
        "Write a short caption in {{ language }} for this handcrafted product.".to_string(),
      ),
    )
    .with_template(
      "hashtags",
      text(
        format!(
          "{source} Suggest 10 relevant {{{{ platform }}}} hashtags for {PRODUCT}, mixing \
           {{{{ language }}}} and English. Return only the hashtags separated by spaces."
        ),
        "List 10 hashtags for a handcrafted product on {{ platform }}.".to_string(),
      ),
    )
}

fn pricing() -> TemplatePromptBuilder {
  TemplatePromptBuilder::new().with_template(
    "pricing",
    text(
      format!(
        "Suggest a fair retail price range in Indian rupees for {PRODUCT} made from \
         {{{{ material }}}} that took {{{{ hours }}}} hours of skilled handwork. Account for \
         material cost, labour and typical marketplace prices{AUDIENCE_FOR_PRICING}. \
         Answer with the range first, then a short justification."
      ),
      "Suggest a price in rupees for a handmade {{ material }} item that took {{ hours }} hours to make."
        .to_string(),
    ),
  )
}

const AUDIENCE_FOR_PRICING: &str = "{% if audience %} for {{ audience }}{% endif %}";

fn transcribe() -> TemplatePromptBuilder {
  TemplatePromptBuilder::new().with_template(
    "transcript",
    text(
      "Transcribe this audio recording verbatim{% if language %}; the speaker uses {{ language }}{% endif %}. \
       Return only the transcript."
        .to_string(),
      "Transcribe this audio.".to_string(),
    ),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use artisan_pipeline::{GenerationRequest, MediaPayload, PromptBuilder};
  use serde_json::json;

  fn request(params: serde_json::Value) -> GenerationRequest {
    GenerationRequest::new(
      MediaPayload::None,
      params.as_object().cloned().unwrap_or_default(),
      vec![],
    )
  }

  #[test]
  fn test_every_flow_variation_has_a_template() {
    for flow in Flow::ALL {
      let builder = builder(flow);
      let mut expected: Vec<&str> = flow.variations().to_vec();
      expected.sort_unstable();
      assert_eq!(builder.variations(), expected, "flow {}", flow);
    }
  }

  #[test]
  fn test_every_template_renders() {
    let params = json!({
      "festival": "Diwali",
      "language": "Hindi",
      "platform": "Instagram",
      "material": "brass",
      "hours": 12,
      "tone": "warm",
      "product_name": "Dhokra lamp",
      "audience": "gift buyers",
    });

    for flow in Flow::ALL {
      let builder = builder(flow);
      for variation in flow.variations() {
        let plan = builder.build(&request(params.clone()), variation).unwrap();
        assert!(!plan.primary.contains("{{"), "{}/{}: {}", flow, variation, plan.primary);
        assert!(plan.fallback.is_some());
        assert_eq!(Some(plan.capability), flow.capability(variation));
      }
    }
  }

  #[test]
  fn test_optional_params_are_omitted() {
    let plan = builder(Flow::EnhanceImage)
      .build(&request(json!({})), "natural")
      .unwrap();
    assert!(plan.primary.starts_with("Enhance this photo of this handcrafted product."));

    let plan = builder(Flow::EnhanceImage)
      .build(&request(json!({ "product_name": "Pashmina shawl" })), "natural")
      .unwrap();
    assert!(plan.primary.contains("\"Pashmina shawl\""));
  }

  #[test]
  fn test_festival_and_pricing_params_render() {
    let plan = builder(Flow::FestivalVideo)
      .build(&request(json!({ "festival": "Pongal" })), "promo_video")
      .unwrap();
    assert!(plan.primary.contains("for Pongal."));

    let plan = builder(Flow::Pricing)
      .build(&request(json!({ "material": "bamboo", "hours": 6 })), "pricing")
      .unwrap();
    assert!(plan.primary.contains("made from bamboo that took 6 hours"));
  }

  #[test]
  fn test_campaign_caption_language_is_optional() {
    let campaign = builder(Flow::FestivalCampaign);

    let plan = campaign
      .build(&request(json!({ "festival": "Onam" })), "caption")
      .unwrap();
    assert!(plan.primary.starts_with("Write one engaging social media caption announcing"));
    assert!(plan.primary.contains("for Onam."));

    let plan = campaign
      .build(&request(json!({ "festival": "Onam", "language": "Malayalam" })), "caption")
      .unwrap();
    assert!(plan.primary.contains("caption in Malayalam announcing"));
  }
}
