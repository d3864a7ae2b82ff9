//! Prompt building.
//!
//! A [`PromptBuilder`] turns `(request, variation)` into a [`TaskPlan`]. Use
//! cases supply their own builder; [`TemplatePromptBuilder`] covers the common
//! case of minijinja templates rendered against the request parameters.

use std::collections::HashMap;

use minijinja::{Environment, Value};

use crate::error::PromptError;
use crate::request::GenerationRequest;
use crate::task::{Capability, TaskPlan};

/// Produces the primary prompt, optional fallback prompt and capability for
/// one variation.
pub trait PromptBuilder: Send + Sync {
  fn build(&self, request: &GenerationRequest, variation: &str) -> Result<TaskPlan, PromptError>;
}

impl<F> PromptBuilder for F
where
  F: Fn(&GenerationRequest, &str) -> Result<TaskPlan, PromptError> + Send + Sync,
{
  fn build(&self, request: &GenerationRequest, variation: &str) -> Result<TaskPlan, PromptError> {
    self(request, variation)
  }
}

/// Templates for one variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
  pub primary: String,
  pub fallback: Option<String>,
  pub capability: Capability,
}

impl PromptTemplate {
  pub fn new(capability: Capability, primary: impl Into<String>) -> Self {
    Self {
      primary: primary.into(),
      fallback: None,
      capability,
    }
  }

  pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
    self.fallback = Some(fallback.into());
    self
  }
}

/// Renders per-variation templates against the request parameters.
///
/// The template context is the request's `params` plus `variation`.
#[derive(Debug, Clone, Default)]
pub struct TemplatePromptBuilder {
  templates: HashMap<String, PromptTemplate>,
}

impl TemplatePromptBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_template(mut self, variation: impl Into<String>, template: PromptTemplate) -> Self {
    self.templates.insert(variation.into(), template);
    self
  }

  /// Known variation names, sorted.
  pub fn variations(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  pub fn template(&self, variation: &str) -> Option<&PromptTemplate> {
    self.templates.get(variation)
  }
}

impl PromptBuilder for TemplatePromptBuilder {
  fn build(&self, request: &GenerationRequest, variation: &str) -> Result<TaskPlan, PromptError> {
    let template = self
      .templates
      .get(variation)
      .ok_or_else(|| PromptError::UnknownVariation {
        variation: variation.to_string(),
      })?;

    let mut context = request.params().clone();
    context.insert(
      "variation".to_string(),
      serde_json::Value::String(variation.to_string()),
    );
    let context = Value::from_serialize(&context);

    let env = Environment::new();
    let primary = render(&env, variation, &template.primary, &context)?;
    let fallback = template
      .fallback
      .as_deref()
      .map(|fallback| render(&env, variation, fallback, &context))
      .transpose()?;

    Ok(TaskPlan {
      primary,
      fallback,
      capability: template.capability,
    })
  }
}

fn render(
  env: &Environment,
  variation: &str,
  template: &str,
  context: &Value,
) -> Result<String, PromptError> {
  env
    .render_str(template, context.clone())
    .map(|rendered| rendered.trim().to_string())
    .map_err(|e| PromptError::Render {
      variation: variation.to_string(),
      message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::request::MediaPayload;
  use serde_json::json;

  fn request(params: serde_json::Value) -> GenerationRequest {
    let params = params.as_object().cloned().unwrap_or_default();
    GenerationRequest::new(MediaPayload::None, params, vec!["traditional".to_string()])
  }

  fn builder() -> TemplatePromptBuilder {
    TemplatePromptBuilder::new().with_template(
      "traditional",
      PromptTemplate::new(
        Capability::Image,
        "A {{ variation }} {{ festival }} poster{% if tone %} in a {{ tone }} tone{% endif %}.",
      )
      .with_fallback("A simple {{ festival }} poster."),
    )
  }

  #[test]
  fn test_renders_params_and_variation() {
    let plan = builder()
      .build(&request(json!({ "festival": "Diwali", "tone": "warm" })), "traditional")
      .unwrap();

    assert_eq!(plan.primary, "A traditional Diwali poster in a warm tone.");
    assert_eq!(plan.fallback.as_deref(), Some("A simple Diwali poster."));
    assert_eq!(plan.capability, Capability::Image);
  }

  #[test]
  fn test_optional_param_omitted() {
    let plan = builder()
      .build(&request(json!({ "festival": "Holi" })), "traditional")
      .unwrap();
    assert_eq!(plan.primary, "A traditional Holi poster.");
  }

  #[test]
  fn test_unknown_variation() {
    let err = builder().build(&request(json!({})), "modern").unwrap_err();
    assert_eq!(
      err,
      PromptError::UnknownVariation {
        variation: "modern".to_string()
      }
    );
  }

  #[test]
  fn test_render_error() {
    let builder = TemplatePromptBuilder::new().with_template(
      "broken",
      PromptTemplate::new(Capability::Text, "{{ unclosed"),
    );
    let err = builder.build(&request(json!({})), "broken").unwrap_err();
    assert!(matches!(err, PromptError::Render { variation, .. } if variation == "broken"));
  }

  #[test]
  fn test_closure_builder() {
    let builder = |_: &GenerationRequest, variation: &str| -> Result<TaskPlan, PromptError> {
      Ok(TaskPlan::new(Capability::Text, format!("write a {}", variation)))
    };
    let plan = builder.build(&request(json!({})), "caption").unwrap();
    assert_eq!(plan.primary, "write a caption");
    assert!(plan.fallback.is_none());
  }

  #[test]
  fn test_variations_sorted() {
    let builder = builder().with_template("modern", PromptTemplate::new(Capability::Image, "x"));
    assert_eq!(builder.variations(), vec!["modern", "traditional"]);
  }
}
