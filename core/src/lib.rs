// src/lib.rs

//! Mixflow: an ASYNC pipeline runner that folds mixins into an immutable state.
//!
//! A pipeline is an ordered list of stages. Each stage is either a single
//! asynchronous *mixin* (`state -> partial state`) or a parallel group of mixins
//! that all observe the same snapshot. Stage outputs are deep-merged into the
//! running state:
//!  - Later sequential stages win over earlier ones on conflicting scalar keys.
//!  - Within a parallel group, earlier-listed siblings win over later ones,
//!    whatever order they actually finish in.
//!  - Nested mappings are merged key by key rather than replaced.
//!  - Snapshots are never mutated; every mixin gets its own immutable view.
//!  - Whole pipelines can be nested as mixins, so sequential and parallel
//!    stages compose to any depth.

pub mod args;
pub mod core;
pub mod error;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::merge::{merge, merge_siblings, DeepMerge};
pub use crate::core::mixin::{identity, mixin, seed, transform_mixin, Mixin, MixinFuture, Transform};
pub use crate::core::stage::{StageDef, StageKind};
pub use crate::core::state::{Opaque, State, Value};

pub use crate::pipeline::checkpoint::CheckpointRunner;
pub use crate::pipeline::definition::{Pipeline, PipelineState};

pub use crate::args::{parse_value, ArgList};

pub use crate::error::{MixflowError, MixflowResult};

/*
    Core Workflow:
    1. Pick a state type: the untyped `State` map, or a record whose fields are
       `Option`s with `deep_merge_fields!` applied to it.
    2. Create a `Pipeline<S, Err>` and append stages with `.then()`,
       `.then_transform()`, `.parallel()` and `.then_pipeline()`.
    3. Call `pipeline.run().await` (or `.run_from(initial)`) to get the final state.
    4. For step-by-step suites, wrap the pipeline in a `CheckpointRunner` and
       call `.run_to(n)` for each checkpoint of interest.
*/
