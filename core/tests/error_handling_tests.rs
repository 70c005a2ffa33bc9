// tests/error_handling_tests.rs
mod common;
use common::*;
use mixflow::{mixin, MixflowError, Pipeline, StageDef, State};
use serde_json::json;
use serial_test::serial;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;

#[tokio::test]
async fn test_failing_mixin_aborts_remaining_stages() {
  setup_tracing();
  let later_runs = Arc::new(AtomicUsize::new(0));

  let mut pipeline = Pipeline::<State, TestError>::new();
  pipeline
    .then_mixin("good", constant(state(json!({ "a": 1 }))))
    .then_mixin("bad", failing("I am a bad stage!"))
    .then_mixin("never", counting(Arc::clone(&later_runs), state(json!({ "b": 2 }))));

  let result = pipeline.run().await;
  assert_eq!(result, Err(TestError::Mixin("I am a bad stage!".to_string())));
  assert_eq!(later_runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[serial]
async fn test_failing_sibling_fails_the_group() {
  setup_tracing();
  let later_runs = Arc::new(AtomicUsize::new(0));

  let mut pipeline = Pipeline::<State, TestError>::new();
  pipeline
    .parallel(
      "group",
      vec![
        delayed(state(json!({ "slow": true })), Duration::from_millis(200)),
        failing("sibling exploded"),
      ],
    )
    .then_mixin("after", counting(Arc::clone(&later_runs), State::new()));

  let result = pipeline.run().await;
  assert_eq!(result, Err(TestError::Mixin("sibling exploded".to_string())));
  assert_eq!(later_runs.load(Ordering::SeqCst), 0);
}

// A pipeline whose error type IS MixflowError, fed by anyhow-based mixins.
#[tokio::test]
async fn test_pipeline_with_mixflow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<State, MixflowError>::new();
  pipeline.then("needs_unlock", |input: State| async move {
    let unlock = input.require_i64("unlockSeconds")?;
    Ok::<State, MixflowError>(State::new().with("unlocked", unlock > 0))
  });

  match pipeline.run().await {
    Err(MixflowError::MissingKey { key }) => assert_eq!(key, "unlockSeconds"),
    other => panic!("Expected MixflowError::MissingKey, got {:?}", other),
  }

  let ok = pipeline.run_from(State::new().with("unlockSeconds", 1)).await.unwrap();
  assert!(ok.require_bool("unlocked").unwrap());

  let mut failing_pipeline = Pipeline::<State, MixflowError>::new();
  failing_pipeline.then("rpc", |_input: State| async move {
    Err::<State, anyhow::Error>(anyhow::anyhow!("connection refused"))
  });
  match failing_pipeline.run().await {
    Err(MixflowError::MixinError { source }) => assert_eq!(source.to_string(), "connection refused"),
    other => panic!("Expected MixflowError::MixinError, got {:?}", other),
  }
}

#[tokio::test]
async fn test_nested_pipeline_error_propagates() {
  setup_tracing();
  let mut inner = Pipeline::<State, TestError>::new();
  inner.then_mixin("inner_bad", failing("inner failure"));

  let mut outer = Pipeline::<State, TestError>::new();
  outer.parallel("group", vec![constant(State::new().with("ok", true)), inner.into_mixin()]);

  assert_eq!(outer.run().await, Err(TestError::Mixin("inner failure".to_string())));
}

#[tokio::test]
async fn test_failing_stage_in_sequential_nested_pipeline() {
  setup_tracing();
  let later_runs = Arc::new(AtomicUsize::new(0));
  let mut inner = Pipeline::<State, TestError>::new();
  inner
    .then_mixin("inner_ok", constant(State::new().with("inner", true)))
    .then_mixin("inner_bad", failing("nested stage failed"));

  let mut outer = Pipeline::<State, TestError>::new();
  outer
    .then_pipeline("inner", inner)
    .then_mixin("after", counting(Arc::clone(&later_runs), State::new()));

  assert_eq!(outer.run().await, Err(TestError::Mixin("nested stage failed".to_string())));
  assert_eq!(later_runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_range_rejects_out_of_bounds() {
  setup_tracing();
  let pipeline: Pipeline<State, TestError> = vec![StageDef::single("only", constant(State::new()))]
    .into_iter()
    .collect();

  match pipeline.run_range(0, 2, State::new()).await {
    Err(TestError::Mixflow(s)) => assert!(s.contains("StageRangeOutOfBounds")),
    other => panic!("Expected StageRangeOutOfBounds, got {:?}", other),
  }
  assert!(pipeline.run_range(1, 1, State::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_type_mismatch_surfaces_from_mixin() {
  setup_tracing();
  let mut pipeline = Pipeline::<State, MixflowError>::new();
  pipeline
    .then_mixin("seed", mixflow::seed(State::new().with("unlockSeconds", "soon")))
    .then_mixin(
      "read",
      mixin(|input: State| async move {
        input.require_i64("unlockSeconds")?;
        Ok::<State, MixflowError>(State::new())
      }),
    );

  match pipeline.run().await {
    Err(MixflowError::TypeMismatch { key, expected, found }) => {
      assert_eq!(key, "unlockSeconds");
      assert_eq!(expected, "int");
      assert_eq!(found, "string");
    }
    other => panic!("Expected MixflowError::TypeMismatch, got {:?}", other),
  }
}
