use artisan_flows::FlowError;
use artisan_pipeline::PipelineError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or invalid input. Maps to 400 `{"error"}`.
  #[error("{0}")]
  BadRequest(String),

  /// The orchestrator failed for the flow. Maps to 500
  /// `{"error", "message", "details"}`.
  #[error("{flow} failed: {source}")]
  Generation {
    flow: String,
    #[source]
    source: PipelineError,
  },
}

impl From<FlowError> for ApiError {
  fn from(err: FlowError) -> Self {
    ApiError::BadRequest(err.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::BadRequest(message) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
      }
      ApiError::Generation {
        source: PipelineError::InvalidRequest { message },
        ..
      } => (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response(),
      ApiError::Generation { flow, source } => {
        let details = source.details();
        warn!(flow = %flow, error = %source, "request_failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({
            "error": format!("{} failed", flow),
            "message": source.to_string(),
            "details": details,
          })),
        )
          .into_response()
      }
    }
  }
}
