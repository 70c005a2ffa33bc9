// mixflow/src/core/mixin.rs

//! Defines the `Mixin<S, Err>` type, the unit of work a pipeline stage runs,
//! and adapters that turn closures and `Transform` implementors into mixins.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The boxed future a mixin returns.
pub type MixinFuture<S, Err> = Pin<Box<dyn Future<Output = Result<S, Err>> + Send>>;

/// Type alias for a pipeline mixin.
///
/// A mixin is an asynchronous function that receives the current state snapshot
/// `S` by value and resolves to a *partial* state: only the keys it wants to
/// contribute or overwrite. The runner merges that partial state into its
/// accumulator; the mixin never sees, and cannot alter, the accumulator itself.
///
/// Mixins are `Arc`-shared so pipelines can be cloned and nested.
pub type Mixin<S, Err> = Arc<dyn Fn(S) -> MixinFuture<S, Err> + Send + Sync>;

/// Wraps an async closure as a `Mixin<S, Err>`.
///
/// The closure may fail with any error convertible into the pipeline's `Err`.
pub fn mixin<S, Err, F, Fut, E>(f: F) -> Mixin<S, Err>
where
  S: Send + 'static,
  Err: 'static,
  F: Fn(S) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<S, E>> + Send + 'static,
  E: Into<Err> + 'static,
{
  Arc::new(move |state: S| -> MixinFuture<S, Err> {
    let user_fut = f(state);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}

/// A mixin that contributes `state` regardless of its input.
///
/// Typically the first stage of a pipeline, used to seed initial values.
pub fn seed<S, Err>(state: S) -> Mixin<S, Err>
where
  S: Clone + Send + Sync + 'static,
  Err: 'static,
{
  Arc::new(move |_input: S| -> MixinFuture<S, Err> {
    let seeded = state.clone();
    Box::pin(async move { Ok(seeded) })
  })
}

/// A mixin that hands its input back unchanged.
pub fn identity<S, Err>() -> Mixin<S, Err>
where
  S: Send + 'static,
  Err: 'static,
{
  Arc::new(|state: S| -> MixinFuture<S, Err> { Box::pin(async move { Ok(state) }) })
}

/// A struct-based mixin, for units of work that carry their own configuration.
#[async_trait]
pub trait Transform<S, Err>: Send + Sync
where
  S: Send + 'static,
{
  /// Produces a partial state from the given snapshot.
  async fn apply(&self, state: S) -> Result<S, Err>;
}

/// Adapts a `Transform` into a `Mixin`.
pub fn transform_mixin<S, Err, T>(transform: T) -> Mixin<S, Err>
where
  S: Send + 'static,
  Err: 'static,
  T: Transform<S, Err> + 'static,
{
  let transform = Arc::new(transform);
  Arc::new(move |state: S| -> MixinFuture<S, Err> {
    let transform = Arc::clone(&transform);
    Box::pin(async move { transform.apply(state).await })
  })
}
