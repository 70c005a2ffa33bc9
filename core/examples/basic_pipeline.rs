// mixflow/examples/basic_pipeline.rs

use mixflow::{ArgList, MixflowError, Pipeline, State};
use tracing::info;

// Try: cargo run --example basic_pipeline -- --unlockSeconds 30 --network ropsten

#[tokio::main]
async fn main() -> Result<(), MixflowError> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Pipeline Example ---");

  // 1. Defaults for anything not supplied on the command line
  let defaults: State = [("unlockSeconds", mixflow::Value::Int(1)), ("network", "devnet".into())]
    .into_iter()
    .collect();

  // 2. Build the pipeline. Each stage returns only what it adds.
  let mut pipeline = Pipeline::<State, MixflowError>::new();
  pipeline
    .then_transform("args", ArgList::from_process_args(defaults))
    .then("connect", |input: State| async move {
      let network = input.require_str("network")?;
      info!("Connecting to {}", network);
      let endpoint = format!("https://{}.example.invalid", network);
      Ok::<State, MixflowError>(State::new().with("connection", State::new().with("endpoint", endpoint)))
    })
    .then("unlock", |input: State| async move {
      let seconds = input.require_i64("unlockSeconds")?;
      info!("Unlocking account for {}s", seconds);
      Ok::<State, MixflowError>(
        State::new()
          .with("connection", State::new().with("unlocked", true))
          .with("unlockMillis", seconds * 1000),
      )
    });

  info!("Stages: {:?}", pipeline.stage_names());

  // 3. Run it. Nested maps from different stages are merged, not replaced.
  let result = pipeline.run().await?;

  info!("Final state: {}", result);
  info!(
    "Endpoint survives the later 'connection' delta: {:?}",
    result.get_path(&["connection", "endpoint"])
  );

  Ok(())
}
