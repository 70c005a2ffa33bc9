// mixflow/src/pipeline/execution.rs

//! Contains the `Pipeline::run()` family of methods, responsible for folding the
//! pipeline's stages into a final state, and `Pipeline::into_mixin()` for nesting
//! a whole pipeline inside a parallel group.

use crate::core::merge::{merge_siblings, DeepMerge};
use crate::core::mixin::{Mixin, MixinFuture};
use crate::core::stage::{StageDef, StageKind};
use crate::error::MixflowError;
use crate::pipeline::definition::{Pipeline, PipelineState};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{event, instrument, span, Instrument, Level};

/// Outcome of executing a run of stages.
pub(crate) struct Execution<S> {
  /// `initial` with every stage applied, in order.
  pub(crate) state: S,
  /// The stage deltas merged with each other, without `initial`.
  /// `None` when no stage ran.
  pub(crate) delta: Option<S>,
}

impl<S, Err> Pipeline<S, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  /// Executes the pipeline from the empty state and returns the final state.
  ///
  /// The first failing mixin aborts the run; its error is returned as is and
  /// no later stage executes.
  pub async fn run(&self) -> Result<S, Err> {
    self.run_from(S::default()).await
  }

  /// Executes the pipeline starting from `initial` instead of the empty state.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline_state_type = %std::any::type_name::<S>(),
      num_stages = self.stages.len(),
    ),
    err(Display)
  )]
  pub async fn run_from(&self, initial: S) -> Result<S, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let execution = self.execute(0, self.stages.len(), initial).await?;
    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(execution.state)
  }

  /// Executes stages `start..end` only, starting from `initial`.
  #[instrument(
    name = "Pipeline::run_range",
    skip_all,
    fields(start = start, end = end, num_stages = self.stages.len()),
    err(Display)
  )]
  pub async fn run_range(&self, start: usize, end: usize, initial: S) -> Result<S, Err> {
    if start > end || end > self.stages.len() {
      event!(Level::ERROR, "Requested stage range is out of bounds.");
      return Err(Err::from(MixflowError::StageRangeOutOfBounds {
        start,
        end,
        stage_count: self.stages.len(),
      }));
    }
    Ok(self.execute(start, end, initial).await?.state)
  }

  /// Turns the whole pipeline into a single mixin, for use as a parallel sibling.
  ///
  /// The mixin runs every stage against the snapshot it is given and returns the
  /// merge of the stage deltas only, so the enclosing group sees exactly what
  /// this pipeline contributed and a nested chain never re-asserts keys it merely
  /// read.
  ///
  /// Merged deltas cannot express a nested mapping that a stage replaced with a
  /// scalar and a later stage rebuilt. To nest a pipeline in sequence with the
  /// exact result of running its stages inline, use [`Pipeline::then_pipeline`].
  pub fn into_mixin(self) -> Mixin<S, Err> {
    let pipeline = Arc::new(self);
    Arc::new(move |state: S| -> MixinFuture<S, Err> {
      let pipeline = Arc::clone(&pipeline);
      Box::pin(async move {
        let execution = pipeline.execute(0, pipeline.stages.len(), state).await?;
        Ok(execution.delta.unwrap_or_default())
      })
    })
  }

  pub(crate) async fn execute(&self, start: usize, end: usize, initial: S) -> Result<Execution<S>, Err> {
    fold_stages(&self.stages[start..end], start, initial).await
  }
}

/// Applies `stages` in order to `initial`. `first_index` only labels the spans.
fn fold_stages<'a, S, Err>(stages: &'a [StageDef<S, Err>], first_index: usize, initial: S) -> BoxFuture<'a, Result<Execution<S>, Err>>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  async move {
    let mut acc = initial;
    let mut delta: Option<S> = None;

    for (offset, stage) in stages.iter().enumerate() {
      let stage_span = span!(
        Level::INFO,
        "pipeline_stage_execution",
        stage_name = stage.name.as_str(),
        stage_index = first_index + offset,
        parallel = stage.is_parallel()
      );

      // A failed stage contributes nothing: `?` returns before `acc` is replaced.
      let outcome = apply_stage(stage, acc).instrument(stage_span).await?;

      acc = outcome.state;
      if let Some(stage_delta) = outcome.delta {
        delta = Some(match delta {
          Some(so_far) => so_far.deep_merge(&stage_delta),
          None => stage_delta,
        });
      }
    }

    Ok(Execution { state: acc, delta })
  }
  .boxed()
}

/// Runs one stage against `acc` and returns the next accumulator with the
/// stage's own delta.
async fn apply_stage<S, Err>(stage: &StageDef<S, Err>, acc: S) -> Result<Execution<S>, Err>
where
  S: PipelineState,
  Err: std::error::Error + From<MixflowError> + Send + Sync + 'static,
{
  match &stage.kind {
    StageKind::Single(mixin) => {
      event!(Level::TRACE, "Executing single mixin.");
      match mixin(acc.clone()).await {
        Ok(delta) => {
          event!(Level::DEBUG, "Stage finished successfully.");
          Ok(Execution {
            state: acc.deep_merge(&delta),
            delta: Some(delta),
          })
        }
        Err(e) => {
          event!(Level::ERROR, error = %e, "Mixin failed.");
          Err(e)
        }
      }
    }
    StageKind::Parallel(mixins) => {
      event!(Level::DEBUG, siblings = mixins.len(), "Running mixins in parallel.");
      // Every sibling gets its own handle on the same pre-group snapshot.
      // `try_join_all` keeps input order, so the tie-break below does not
      // depend on which sibling settles first. On the first error the
      // remaining siblings are dropped.
      let deltas = try_join_all(mixins.iter().enumerate().map(|(sibling_idx, mixin)| {
        let sibling = mixin(acc.clone());
        async move {
          sibling.await.map_err(|e| {
            event!(Level::ERROR, sibling_index = sibling_idx, error = %e, "Parallel mixin failed.");
            e
          })
        }
      }))
      .await?;

      // An empty group folds to the empty delta and leaves `acc` as it was.
      event!(Level::DEBUG, "All parallel mixins settled; combining sibling deltas.");
      let group_delta = merge_siblings(deltas);
      Ok(Execution {
        state: acc.deep_merge(&group_delta),
        delta: Some(group_delta),
      })
    }
    StageKind::Chain(stages) => {
      event!(Level::DEBUG, nested_stages = stages.len(), "Running nested pipeline inline.");
      fold_stages(stages, 0, acc).await
    }
  }
}
