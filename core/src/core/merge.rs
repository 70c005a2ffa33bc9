// mixflow/src/core/merge.rs

//! The deep-merge primitive used to fold partial states into the running state.
//!
//! `base.deep_merge(&overlay)` keeps every key present in either side. When a key
//! exists in both and both values are mappings the merge recurses; any other
//! conflict is resolved in favour of `overlay`. Neither input is modified.

use super::state::{Opaque, State, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Types that can be combined by recursive, overlay-wins merging.
///
/// Implement it for typed pipeline records with [`deep_merge_fields!`](crate::deep_merge_fields).
pub trait DeepMerge: Sized {
  fn deep_merge(&self, overlay: &Self) -> Self;
}

/// `merge(base, overlay)`, the free-function form of [`DeepMerge::deep_merge`].
pub fn merge<T: DeepMerge>(base: &T, overlay: &T) -> T {
  base.deep_merge(overlay)
}

/// Combines the outputs of a parallel group into a single delta.
///
/// Earlier siblings win over later ones: the fold computes
/// `merge(d_k, ... merge(d_1, d_0))`, so the result accumulated from earlier
/// siblings always plays the overlay. Only scalar leaves are subject to this
/// tie-break; nested mappings still merge key by key. An empty group yields
/// `T::default()`.
pub fn merge_siblings<T, I>(deltas: I) -> T
where
  T: DeepMerge + Default,
  I: IntoIterator<Item = T>,
{
  let mut deltas = deltas.into_iter();
  match deltas.next() {
    Some(first) => deltas.fold(first, |so_far, sibling| sibling.deep_merge(&so_far)),
    None => T::default(),
  }
}

impl DeepMerge for State {
  fn deep_merge(&self, overlay: &Self) -> Self {
    // Sharing an input is safe, snapshots are immutable.
    if overlay.is_empty() {
      return self.clone();
    }
    if self.is_empty() {
      return overlay.clone();
    }

    let mut merged = self.entries().clone();
    for (key, value) in overlay.entries() {
      let next = match merged.get(key) {
        Some(existing) => existing.deep_merge(value),
        None => value.clone(),
      };
      merged.insert(key.clone(), next);
    }
    State::from_map(merged)
  }
}

impl DeepMerge for Value {
  fn deep_merge(&self, overlay: &Self) -> Self {
    match (self, overlay) {
      (Value::Map(base), Value::Map(top)) => Value::Map(base.deep_merge(top)),
      (_, top) => top.clone(),
    }
  }
}

macro_rules! overlay_wins {
  ($($t:ty),* $(,)?) => {
    $(
      impl DeepMerge for $t {
        fn deep_merge(&self, overlay: &Self) -> Self {
          overlay.clone()
        }
      }
    )*
  };
}

overlay_wins!(
  bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String, Opaque,
);

impl<T: Clone> DeepMerge for Vec<T> {
  fn deep_merge(&self, overlay: &Self) -> Self {
    overlay.clone()
  }
}

impl<T: ?Sized> DeepMerge for Arc<T> {
  fn deep_merge(&self, overlay: &Self) -> Self {
    Arc::clone(overlay)
  }
}

/// `None` is "not contributed": it never erases a value from the base.
impl<T: DeepMerge + Clone> DeepMerge for Option<T> {
  fn deep_merge(&self, overlay: &Self) -> Self {
    match (self, overlay) {
      (Some(base), Some(top)) => Some(base.deep_merge(top)),
      (base, None) => base.clone(),
      (None, top) => top.clone(),
    }
  }
}

impl<V: DeepMerge + Clone> DeepMerge for BTreeMap<String, V> {
  fn deep_merge(&self, overlay: &Self) -> Self {
    let mut merged = self.clone();
    for (key, value) in overlay {
      let next = match merged.get(key) {
        Some(existing) => existing.deep_merge(value),
        None => value.clone(),
      };
      merged.insert(key.clone(), next);
    }
    merged
  }
}

impl<V: DeepMerge + Clone> DeepMerge for HashMap<String, V> {
  fn deep_merge(&self, overlay: &Self) -> Self {
    let mut merged = self.clone();
    for (key, value) in overlay {
      let next = match merged.get(key) {
        Some(existing) => existing.deep_merge(value),
        None => value.clone(),
      };
      merged.insert(key.clone(), next);
    }
    merged
  }
}

/// Implements [`DeepMerge`] for a struct by merging it field by field.
///
/// Every field must be listed and must itself implement `DeepMerge`. Wrap fields
/// a stage may leave untouched in `Option` so that an absent contribution keeps
/// the base value.
///
/// ```
/// use mixflow::{deep_merge_fields, DeepMerge};
///
/// #[derive(Clone, Default)]
/// struct Deploy {
///   chain_id: Option<String>,
///   gas: Option<u64>,
/// }
/// deep_merge_fields!(Deploy { chain_id, gas });
///
/// let base = Deploy { chain_id: Some("2222".into()), gas: None };
/// let delta = Deploy { chain_id: None, gas: Some(21_000) };
/// let merged = base.deep_merge(&delta);
/// assert_eq!(merged.chain_id.as_deref(), Some("2222"));
/// assert_eq!(merged.gas, Some(21_000));
/// ```
#[macro_export]
macro_rules! deep_merge_fields {
  ($ty:ty { $($field:ident),+ $(,)? }) => {
    impl $crate::DeepMerge for $ty {
      fn deep_merge(&self, overlay: &Self) -> Self {
        Self {
          $($field: $crate::DeepMerge::deep_merge(&self.$field, &overlay.$field)),+
        }
      }
    }
  };
}
