use std::time::Instant;

use artisan_flows::Flow;
use artisan_pipeline::GenerationResult;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::info;

use crate::body::GenerateInput;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body limit, sized for product photos and voice notes.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// `POST /api/{flow}` for every flow, plus `GET /health`.
pub fn api_routes() -> Router<AppState> {
  Flow::ALL
    .into_iter()
    .fold(
      Router::new().route("/health", get(health)),
      |router, flow| {
        router.route(
          &format!("/api/{}", flow.name()),
          post(move |state: State<AppState>, input: GenerateInput| generate(flow, state, input)),
        )
      },
    )
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn health() -> Json<Value> {
  Json(json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

async fn generate(
  flow: Flow,
  State(state): State<AppState>,
  GenerateInput(body): GenerateInput,
) -> Result<Json<GenerationResult>, ApiError> {
  let media = body.media_for(flow)?;
  let request = flow.prepare(media, body.params, body.variations)?;
  let request_id = request.request_id().to_string();

  let started = Instant::now();
  let result = flow
    .run(state.orchestrator(), request, state.run_token())
    .await
    .map_err(|source| ApiError::Generation {
      flow: flow.name().to_string(),
      source,
    })?;

  info!(
    flow = flow.name(),
    request_id = %request_id,
    status = ?result.overall_status(),
    elapsed_ms = started.elapsed().as_millis() as u64,
    "request_completed"
  );
  Ok(Json(result))
}
