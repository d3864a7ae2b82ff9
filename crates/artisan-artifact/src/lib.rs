//! Artisan Artifact
//!
//! Storage for generated outputs. The [`Store`] trait is the backend layer
//! (filesystem today); [`persist_result`] turns a finished
//! [`GenerationResult`](artisan_pipeline::GenerationResult) into stored files.
//!
//! Keys are relative, `/`-separated paths such as `{request_id}/natural.png`.
//! The pipeline itself never touches storage.

mod fs;
mod outputs;

pub use fs::FsStore;
pub use outputs::{OutputArtifact, outcome_artifact, persist_result};

use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// A boxed stream of bytes for artifact data.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("artifact not found: {0}")]
  NotFound(String),

  /// Empty, absolute, or escaping the store root.
  #[error("invalid artifact key: {0}")]
  InvalidKey(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A payload's base64 media could not be decoded.
  #[error("invalid media in '{key}': {source}")]
  Decode {
    key: String,
    #[source]
    source: base64::DecodeError,
  },

  #[error("failed to encode artifact: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Artifact storage backend.
#[async_trait]
pub trait Store: Send + Sync {
  /// Retrieve an artifact as a stream of bytes.
  async fn get(&self, key: &str) -> Result<ByteStream, Error>;

  /// Store an artifact, replacing any existing one.
  async fn put(&self, key: &str, data: ByteStream, content_type: &str) -> Result<(), Error>;

  async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// A stream yielding `data` as one chunk.
pub fn single_chunk(data: impl Into<Bytes>) -> ByteStream {
  let data = data.into();
  Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Drain a stream into one buffer.
pub async fn read_all(mut stream: ByteStream) -> Result<Bytes, Error> {
  let mut buf = BytesMut::new();
  while let Some(chunk) = stream.next().await {
    buf.extend_from_slice(&chunk?);
  }
  Ok(buf.freeze())
}
