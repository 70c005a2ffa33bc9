// mixflow/src/core/stage.rs

//! Defines the structure for a single stage within a pipeline.

use super::mixin::Mixin;

/// What a stage runs: one mixin, a group of mixins run concurrently against
/// the same input snapshot, or the stages of a nested pipeline.
pub enum StageKind<S, Err> {
  Single(Mixin<S, Err>),
  /// Sibling order is significant: on conflicting scalar keys, earlier siblings win.
  /// An empty group leaves the state unchanged.
  Parallel(Vec<Mixin<S, Err>>),
  /// Applied one by one to the running state, exactly as if they were listed
  /// in the enclosing pipeline.
  Chain(Vec<StageDef<S, Err>>),
}

/// Definition of a pipeline stage. The name is only used for tracing and errors.
pub struct StageDef<S, Err> {
  pub name: String,
  pub kind: StageKind<S, Err>,
}

impl<S, Err> StageDef<S, Err> {
  pub fn single(name: impl Into<String>, mixin: Mixin<S, Err>) -> Self {
    Self {
      name: name.into(),
      kind: StageKind::Single(mixin),
    }
  }

  pub fn parallel(name: impl Into<String>, mixins: Vec<Mixin<S, Err>>) -> Self {
    Self {
      name: name.into(),
      kind: StageKind::Parallel(mixins),
    }
  }

  pub fn chain(name: impl Into<String>, stages: Vec<StageDef<S, Err>>) -> Self {
    Self {
      name: name.into(),
      kind: StageKind::Chain(stages),
    }
  }

  pub fn is_parallel(&self) -> bool {
    matches!(self.kind, StageKind::Parallel(_))
  }

  /// Number of mixins this stage runs.
  pub fn width(&self) -> usize {
    match &self.kind {
      StageKind::Single(_) => 1,
      StageKind::Parallel(mixins) => mixins.len(),
      StageKind::Chain(stages) => stages.iter().map(StageDef::width).sum(),
    }
  }
}

// Manual impls, derive would add `S: Clone` and `Err: Clone` bounds.
impl<S, Err> Clone for StageKind<S, Err> {
  fn clone(&self) -> Self {
    match self {
      StageKind::Single(mixin) => StageKind::Single(mixin.clone()),
      StageKind::Parallel(mixins) => StageKind::Parallel(mixins.clone()),
      StageKind::Chain(stages) => StageKind::Chain(stages.clone()),
    }
  }
}

impl<S, Err> Clone for StageDef<S, Err> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      kind: self.kind.clone(),
    }
  }
}

// Mixins are closures and don't implement Debug; report the shape instead.
impl<S, Err> std::fmt::Debug for StageDef<S, Err> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StageDef")
      .field("name", &self.name)
      .field("parallel", &self.is_parallel())
      .field("width", &self.width())
      .finish()
  }
}
