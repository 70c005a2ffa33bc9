// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use mixflow::{mixin, Mixin, MixflowError, State, Value};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::{Duration, Instant};
use tracing::Level;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("mixflow framework error: {0}")]
  Mixflow(String), // Store as String for Eq comparison

  #[error("Test mixin failed: {0}")]
  Mixin(String),
}

impl From<MixflowError> for TestError {
  fn from(err: MixflowError) -> Self {
    TestError::Mixflow(format!("{:?}", err))
  }
}

// --- Common Mixin Creators ---

/// A mixin that contributes `delta` without looking at its input.
pub fn constant(delta: State) -> Mixin<State, TestError> {
  mixin(move |_state: State| {
    let delta = delta.clone();
    async move { Ok::<State, TestError>(delta) }
  })
}

/// Like `constant`, but settles only after `delay`.
pub fn delayed(delta: State, delay: Duration) -> Mixin<State, TestError> {
  mixin(move |_state: State| {
    let delta = delta.clone();
    async move {
      tokio::time::sleep(delay).await;
      Ok::<State, TestError>(delta)
    }
  })
}

/// Counts its invocations in `counter` and contributes `delta`.
pub fn counting(counter: Arc<AtomicUsize>, delta: State) -> Mixin<State, TestError> {
  mixin(move |_state: State| {
    counter.fetch_add(1, Ordering::SeqCst);
    let delta = delta.clone();
    async move { Ok::<State, TestError>(delta) }
  })
}

pub fn failing(message: &'static str) -> Mixin<State, TestError> {
  mixin(move |_state: State| async move {
    tracing::warn!(target: "test_mixins", "failing with: '{}'", message);
    Err::<State, TestError>(TestError::Mixin(message.to_string()))
  })
}

/// Mirrors the sibling mixins of the deployment scripts: records an address,
/// a password and its start/end times (ms since `epoch`), optionally nested
/// under `label`, and sets the top-level `lastKey`.
pub fn sibling(prefix: &'static str, delay_ms: u64, label: Option<&'static str>, epoch: Instant) -> Mixin<State, TestError> {
  mixin(move |_state: State| async move {
    let start = epoch.elapsed().as_millis() as i64;
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    let end = epoch.elapsed().as_millis() as i64;

    let fields: State = [
      (format!("{prefix}Address"), Value::from("0x123")),
      (format!("{prefix}Password"), Value::from("0x456")),
      (format!("{prefix}StartTime"), Value::Int(start)),
      (format!("{prefix}EndTime"), Value::Int(end)),
    ]
    .into_iter()
    .collect();

    let out = match label {
      Some(label) => State::new().with(label, fields).with("lastKey", prefix),
      None => fields.with("lastKey", prefix),
    };
    Ok::<State, TestError>(out)
  })
}

/// Builds a `State` from a JSON literal.
pub fn state(json: serde_json::Value) -> State {
  State::try_from(json).expect("test state literal must be a JSON object")
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
