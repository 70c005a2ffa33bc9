// mixflow/src/pipeline/definition.rs

//! Contains the `Pipeline<S, Err>` struct definition and methods for its
//! construction and structural modification.

use crate::core::merge::DeepMerge;
use crate::core::mixin::{mixin, transform_mixin, Mixin, Transform};
use crate::core::stage::StageDef;
use crate::core::state::State;
use crate::error::MixflowError;
use std::future::Future;

/// Bounds every pipeline state type satisfies.
///
/// `Default` must be the empty partial state: merging it into anything is a no-op.
pub trait PipelineState: DeepMerge + Clone + Default + Send + Sync + 'static {}

impl<T> PipelineState for T where T: DeepMerge + Clone + Default + Send + Sync + 'static {}

/// An ordered sequence of stages folded into a single state.
///
/// `S` is the state type threaded through the pipeline (the untyped [`State`] map
/// by default, or any record implementing [`DeepMerge`]). `Err` is the error type
/// its mixins fail with; it must be `From<MixflowError>` so that framework errors
/// (e.g. a malformed stage) surface through the same channel.
pub struct Pipeline<S = State, Err = MixflowError>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  pub(crate) stages: Vec<StageDef<S, Err>>,
}

impl<S, Err> Pipeline<S, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  /// Creates an empty pipeline. Running it yields `S::default()`.
  pub fn new() -> Self {
    Self { stages: Vec::new() }
  }

  pub fn from_stages(stages: Vec<StageDef<S, Err>>) -> Self {
    Self { stages }
  }

  /// Appends a single-mixin stage built from an async closure.
  pub fn then<F, Fut, E>(&mut self, name: impl Into<String>, mixin_fn: F) -> &mut Self
  where
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S, E>> + Send + 'static,
    E: Into<Err> + 'static,
  {
    self.push_stage(StageDef::single(name, mixin(mixin_fn)))
  }

  /// Appends a single-mixin stage from an already boxed mixin.
  pub fn then_mixin(&mut self, name: impl Into<String>, mixin: Mixin<S, Err>) -> &mut Self {
    self.push_stage(StageDef::single(name, mixin))
  }

  pub fn then_transform<T>(&mut self, name: impl Into<String>, transform: T) -> &mut Self
  where
    T: Transform<S, Err> + 'static,
  {
    self.push_stage(StageDef::single(name, transform_mixin(transform)))
  }

  /// Appends a parallel group. Sibling order decides scalar conflicts:
  /// the earlier sibling wins.
  pub fn parallel(&mut self, name: impl Into<String>, mixins: Vec<Mixin<S, Err>>) -> &mut Self {
    self.push_stage(StageDef::parallel(name, mixins))
  }

  /// Nests `pipeline` as one stage. Its stages run in sequence against the
  /// running state, giving the same result as listing them here directly.
  pub fn then_pipeline(&mut self, name: impl Into<String>, pipeline: Pipeline<S, Err>) -> &mut Self {
    self.push_stage(StageDef::chain(name, pipeline.stages))
  }

  pub fn push_stage(&mut self, stage: StageDef<S, Err>) -> &mut Self {
    self.stages.push(stage);
    self
  }

  /// Inserts a stage at `index`. Panics if `index > len()`.
  pub fn insert_stage(&mut self, index: usize, stage: StageDef<S, Err>) -> &mut Self {
    if index > self.stages.len() {
      // Programming error, same as Vec::insert, but with a readable message.
      panic!(
        "mixflow setup error: cannot insert stage '{}' at {} (pipeline has {} stages).",
        stage.name,
        index,
        self.stages.len()
      );
    }
    self.stages.insert(index, stage);
    self
  }

  /// Removes the first stage named `name`, if any.
  pub fn remove_stage(&mut self, name: &str) -> Option<StageDef<S, Err>> {
    let idx = self.stages.iter().position(|s| s.name == name)?;
    Some(self.stages.remove(idx))
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  pub fn stages(&self) -> &[StageDef<S, Err>] {
    &self.stages
  }

  pub fn stage_names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name.as_str()).collect()
  }
}

impl<S, Err> Default for Pipeline<S, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<S, Err> Clone for Pipeline<S, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    Self {
      stages: self.stages.clone(),
    }
  }
}

impl<S, Err> FromIterator<StageDef<S, Err>> for Pipeline<S, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  fn from_iter<I: IntoIterator<Item = StageDef<S, Err>>>(iter: I) -> Self {
    Self::from_stages(iter.into_iter().collect())
  }
}

impl<S, Err> std::fmt::Debug for Pipeline<S, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline").field("stages", &self.stages).finish()
  }
}
