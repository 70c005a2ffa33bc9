// mixflow/src/pipeline/checkpoint.rs

//! Incremental execution of a pipeline, one checkpoint at a time.
//!
//! A `CheckpointRunner` owns a pipeline and the snapshots it produced after
//! given stage counts. Asking for a later checkpoint resumes from the closest
//! earlier one instead of starting over, which is how step-by-step test suites
//! walk a long deployment pipeline without re-running its expensive prefix.

use crate::core::state::State;
use crate::error::MixflowError;
use crate::pipeline::definition::{Pipeline, PipelineState};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Checkpoint `n` is the state after the first `n` stages; checkpoint `0` is the
/// initial state.
pub struct CheckpointRunner<S = State, Err = MixflowError>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<S, Err>>,
  /// Checkpoint 0.
  initial: S,
  /// Checkpoints 1 and up.
  checkpoints: BTreeMap<usize, S>,
}

impl<S, Err> CheckpointRunner<S, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  pub fn new(pipeline: Pipeline<S, Err>, initial: S) -> Self {
    Self::from_shared(Arc::new(pipeline), initial)
  }

  /// Builds a runner over a pipeline that other runners may share.
  pub fn from_shared(pipeline: Arc<Pipeline<S, Err>>, initial: S) -> Self {
    Self {
      pipeline,
      initial,
      checkpoints: BTreeMap::new(),
    }
  }

  pub fn pipeline(&self) -> &Pipeline<S, Err> {
    &self.pipeline
  }

  pub fn stage_count(&self) -> usize {
    self.pipeline.len()
  }

  /// The recorded snapshot after `stage` stages, if that checkpoint was reached.
  pub fn checkpoint(&self, stage: usize) -> Option<&S> {
    match stage {
      0 => Some(&self.initial),
      _ => self.checkpoints.get(&stage),
    }
  }

  /// The furthest checkpoint reached so far, or checkpoint 0.
  pub fn latest(&self) -> (usize, &S) {
    self.closest_at_or_before(usize::MAX)
  }

  fn closest_at_or_before(&self, stage: usize) -> (usize, &S) {
    match self.checkpoints.range(..=stage).next_back() {
      Some((idx, state)) => (*idx, state),
      None => (0, &self.initial),
    }
  }

  /// Returns the state after the first `stage` stages, running only the stages
  /// between the closest recorded checkpoint and `stage`.
  #[instrument(
    name = "CheckpointRunner::run_to",
    skip(self),
    fields(stage_count = self.pipeline.len()),
    err(Display)
  )]
  pub async fn run_to(&mut self, stage: usize) -> Result<S, Err> {
    let stage_count = self.pipeline.len();
    if stage > stage_count {
      event!(Level::ERROR, "Requested checkpoint is past the last stage.");
      return Err(Err::from(MixflowError::CheckpointOutOfRange {
        requested: stage,
        stage_count,
      }));
    }

    let (resume_idx, resume_state) = self.closest_at_or_before(stage);
    let resume_state = resume_state.clone();

    if resume_idx == stage {
      event!(Level::DEBUG, "Checkpoint already recorded; nothing to run.");
      return Ok(resume_state);
    }

    event!(Level::DEBUG, resume_from = resume_idx, "Resuming from checkpoint.");
    let state = self.pipeline.run_range(resume_idx, stage, resume_state).await?;
    self.checkpoints.insert(stage, state.clone());
    Ok(state)
  }

  /// Drops every recorded checkpoint and starts over from `initial`.
  pub fn reset(&mut self, initial: S) {
    self.initial = initial;
    self.checkpoints.clear();
  }
}
