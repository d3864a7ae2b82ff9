//! Artisan Provider
//!
//! [`GoogleGenAiClient`] implements the pipeline's
//! [`GenerationClient`](artisan_pipeline::GenerationClient) on top of Google's
//! generative APIs:
//!
//! - text and image tasks: Gemini `models/{model}:generateContent`
//! - video tasks: Vertex AI Veo `:predictLongRunning`, observed through
//!   `:fetchPredictOperation`
//!
//! Endpoint shapes and authentication stay in this crate; the orchestrator
//! and poller only see payloads and operation handles.

mod client;
mod error;
mod gemini;
mod vertex;

pub use client::GoogleGenAiClient;
pub use error::ProviderError;
