use thiserror::Error;

/// Errors building a provider client.
///
/// Failures of individual calls are reported as
/// [`artisan_pipeline::GenerationError`] instead.
#[derive(Debug, Error)]
pub enum ProviderError {
  /// A credential environment variable is unset or empty.
  #[error("missing credential: environment variable '{env}' is not set")]
  MissingCredential { env: String },

  /// The HTTP client could not be constructed.
  #[error("failed to build http client: {0}")]
  Client(#[from] reqwest::Error),
}
