// mixflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MixflowError {
  #[error("Error in user-provided mixin or external operation. Source: {source}")]
  MixinError {
    #[source]
    source: AnyhowError,
  },

  #[error("Key not found in state: {key}")]
  MissingKey { key: String },

  #[error("Type mismatch for key '{key}' (expected {expected}, found {found})")]
  TypeMismatch {
    key: String,
    expected: String,
    found: String,
  },

  #[error("Invalid state: {0}")]
  InvalidState(String),

  #[error("Stage range {start}..{end} is out of bounds for a pipeline of {stage_count} stages")]
  StageRangeOutOfBounds { start: usize, end: usize, stage_count: usize },

  #[error("Checkpoint {requested} is beyond the last stage ({stage_count} stages)")]
  CheckpointOutOfRange { requested: usize, stage_count: usize },
}

// External errors raised inside mixins arrive here.
impl From<AnyhowError> for MixflowError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<MixflowError>() {
      Ok(inner) => inner,
      Err(err) => MixflowError::MixinError { source: err },
    }
  }
}

pub type MixflowResult<T, E = MixflowError> = std::result::Result<T, E>;
