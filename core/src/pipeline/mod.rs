// mixflow/src/pipeline/mod.rs

//! Defines the `Pipeline<S, Err>` struct, its construction, execution and
//! incremental (checkpointed) execution.

pub mod checkpoint;
pub mod definition;
pub mod execution;

// Re-export the main Pipeline struct
pub use checkpoint::CheckpointRunner;
pub use definition::{Pipeline, PipelineState};
