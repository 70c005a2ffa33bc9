// mixflow/examples/parallel_groups.rs

use mixflow::{mixin, CheckpointRunner, Mixin, MixflowError, Pipeline, State};
use std::time::{Duration, Instant};
use tracing::info;

/// Pretends to create an account, taking `delay_ms` to do so.
fn create_account(role: &'static str, delay_ms: u64) -> Mixin<State, MixflowError> {
  mixin(move |_input: State| async move {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    info!("{} account ready", role);
    Ok::<State, MixflowError>(
      State::new()
        .with("accounts", State::new().with(role, format!("0x{}", role.len())))
        .with("lastCreated", role),
    )
  })
}

#[tokio::main]
async fn main() -> Result<(), MixflowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Parallel Groups Example ---");

  // A nested sequential chain, usable as a single sibling.
  let mut funding = Pipeline::<State, MixflowError>::new();
  funding
    .then_mixin("treasury", create_account("treasury", 300))
    .then("fund", |input: State| async move {
      let treasury = input.require_map("accounts")?.require_str("treasury")?.to_string();
      Ok::<State, MixflowError>(State::new().with("funded", treasury))
    });

  let mut pipeline = Pipeline::<State, MixflowError>::new();
  pipeline
    .then_mixin("seed", mixflow::seed(State::new().with("network", "devnet")))
    .parallel(
      "accounts",
      vec![
        create_account("sender", 500),
        create_account("receiver", 100),
        funding.into_mixin(),
      ],
    )
    .then("report", |input: State| async move {
      let count = input.require_map("accounts")?.len() as i64;
      Ok::<State, MixflowError>(State::new().with("accountCount", count))
    });

  // Siblings overlap, so this takes about as long as the slowest one.
  let started = Instant::now();
  let result = pipeline.run().await?;
  info!("Ran in {:?}: {}", started.elapsed(), result);
  // The receiver finishes first, but the earlier sibling wins the conflict.
  info!("lastCreated = {:?}", result.get("lastCreated"));

  // Resume-able runs: stop after the group, then finish later.
  let mut runner = CheckpointRunner::new(pipeline, State::new());
  let after_group = runner.run_to(2).await?;
  info!("After the group: {} keys", after_group.len());
  let done = runner.run_to(3).await?;
  info!("Finished from checkpoint: accountCount = {:?}", done.get("accountCount"));

  Ok(())
}
