//! Artisan Server
//!
//! API over the artisan flows: `POST /api/{flow}` for each
//! [`Flow`](artisan_flows::Flow) and `GET /health`. Flow endpoints take a
//! JSON body or a multipart form with `image`/`audio` file parts.
//!
//! - 200: the serialized [`GenerationResult`](artisan_pipeline::GenerationResult),
//!   including partial successes
//! - 400: `{"error"}` for missing fields, params or media
//! - 500: `{"error", "message", "details"}` when the run fails as a whole

mod body;
mod error;
mod routes;
mod state;

pub use body::{GenerateBody, GenerateInput, Upload};
pub use error::ApiError;
pub use state::AppState;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Build the application router.
pub fn router(state: AppState) -> Router {
  routes::api_routes().with_state(state)
}

/// Serve on `bind` until `shutdown` is cancelled.
pub async fn serve(bind: &str, state: AppState, shutdown: CancellationToken) -> std::io::Result<()> {
  let listener = TcpListener::bind(bind).await?;
  info!(addr = %listener.local_addr()?, "server_listening");

  axum::serve(listener, router(state))
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
}
