use thiserror::Error;

/// Caller-level input errors, raised before any task is launched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
  #[error("unknown flow '{name}'")]
  UnknownFlow { name: String },

  #[error("{flow} requires parameter '{param}'")]
  MissingParam { flow: String, param: String },

  #[error("{flow} requires {expected} media")]
  MissingMedia { flow: String, expected: String },

  #[error("{flow} has no variation '{variation}'")]
  UnknownVariation { flow: String, variation: String },
}
