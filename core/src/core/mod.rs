pub mod merge;
pub mod mixin;
pub mod stage;
pub mod state;

// Re-export key types for easier access from other mixflow modules (and lib.rs)
pub use merge::{merge, merge_siblings, DeepMerge};
pub use mixin::{identity, mixin, seed, transform_mixin, Mixin, MixinFuture, Transform};
pub use stage::{StageDef, StageKind};
pub use state::{Opaque, State, Value};
