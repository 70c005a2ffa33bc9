// mixflow/src/core/state.rs

//! Defines `State`, the immutable snapshot threaded through a pipeline, and the
//! `Value` type stored under each of its keys.
//!
//! A `State` is an `Arc`-shared ordered map. Cloning a snapshot is O(1) and no
//! method hands out mutable access to the underlying map: "updating" a snapshot
//! with `with`/`without` (or merging into it) always produces a new one, so every
//! snapshot a mixin has been given stays valid and unchanged for its lifetime.

use crate::error::{MixflowError, MixflowResult};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// An opaque, shareable handle stored in state (a network client, a wallet, ...).
///
/// Opaque values are never merged recursively and compare equal only when they
/// point at the same allocation.
#[derive(Clone)]
pub struct Opaque {
  inner: Arc<dyn Any + Send + Sync>,
  type_name: &'static str,
}

impl Opaque {
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self::from_arc(Arc::new(value))
  }

  pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
    let inner: Arc<dyn Any + Send + Sync> = value;
    Self {
      inner,
      type_name: std::any::type_name::<T>(),
    }
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// Returns a typed handle if the stored value is a `T`.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    Arc::clone(&self.inner).downcast::<T>().ok()
  }
}

impl PartialEq for Opaque {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

impl fmt::Debug for Opaque {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Opaque<{}>", self.type_name)
  }
}

/// A value held under a state key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  /// Lists are leaves: a conflicting list is replaced, never merged element-wise.
  List(Vec<Value>),
  /// A nested mapping, merged recursively.
  Map(State),
  Opaque(Opaque),
}

impl Value {
  /// Short name of the variant, used in type-mismatch errors.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::Str(_) => "string",
      Value::List(_) => "list",
      Value::Map(_) => "map",
      Value::Opaque(_) => "opaque",
    }
  }

  pub fn is_map(&self) -> bool {
    matches!(self, Value::Map(_))
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  /// Floats, and integers widened to `f64`.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Float(f) => Some(*f),
      Value::Int(i) => Some(*i as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s.as_str()),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items.as_slice()),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&State> {
    match self {
      Value::Map(state) => Some(state),
      _ => None,
    }
  }

  pub fn as_opaque(&self) -> Option<&Opaque> {
    match self {
      Value::Opaque(handle) => Some(handle),
      _ => None,
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      Value::Null => serde_json::Value::Null,
      Value::Bool(b) => serde_json::Value::Bool(*b),
      Value::Int(i) => serde_json::Value::from(*i),
      Value::Float(f) => serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
      Value::Str(s) => serde_json::Value::String(s.clone()),
      Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
      Value::Map(state) => state.to_json(),
      Value::Opaque(handle) => serde_json::Value::String(format!("<opaque {}>", handle.type_name())),
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self {
    Value::Int(i64::from(i))
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self {
    Value::Int(i)
  }
}

impl From<u32> for Value {
  fn from(i: u32) -> Self {
    Value::Int(i64::from(i))
  }
}

impl From<f64> for Value {
  fn from(f: f64) -> Self {
    Value::Float(f)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Str(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::Str(s)
  }
}

impl From<State> for Value {
  fn from(state: State) -> Self {
    Value::Map(state)
  }
}

impl From<Opaque> for Value {
  fn from(handle: Opaque) -> Self {
    Value::Opaque(handle)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(items: Vec<T>) -> Self {
    Value::List(items.into_iter().map(Into::into).collect())
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(opt: Option<T>) -> Self {
    opt.map_or(Value::Null, Into::into)
  }
}

impl From<serde_json::Value> for Value {
  fn from(json: serde_json::Value) -> Self {
    match json {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => match n.as_i64() {
        Some(i) => Value::Int(i),
        None => n.as_f64().map_or(Value::Null, Value::Float),
      },
      serde_json::Value::String(s) => Value::Str(s),
      serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
      serde_json::Value::Object(fields) => Value::Map(fields.into_iter().collect()),
    }
  }
}

/// Immutable mapping from string keys to values.
#[derive(Clone, Default, PartialEq)]
pub struct State(Arc<BTreeMap<String, Value>>);

impl State {
  /// The empty state every pipeline run starts from.
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn from_map(map: BTreeMap<String, Value>) -> Self {
    State(Arc::new(map))
  }

  pub(crate) fn entries(&self) -> &BTreeMap<String, Value> {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  /// Follows `path` through nested maps, e.g. `["sub", "senderAddress"]`.
  pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
    let (first, rest) = path.split_first()?;
    let mut current = self.get(first)?;
    for segment in rest {
      current = current.as_map()?.get(segment)?;
    }
    Some(current)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Returns a new snapshot with `key` bound to `value`; `self` is left as is.
  #[must_use]
  pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    let mut map = (*self.0).clone();
    map.insert(key.into(), value.into());
    Self::from_map(map)
  }

  /// Returns a new snapshot without `key`; `self` is left as is.
  #[must_use]
  pub fn without(&self, key: &str) -> Self {
    if !self.contains_key(key) {
      return self.clone();
    }
    let mut map = (*self.0).clone();
    map.remove(key);
    Self::from_map(map)
  }

  pub fn require(&self, key: &str) -> MixflowResult<&Value> {
    self.get(key).ok_or_else(|| MixflowError::MissingKey { key: key.to_string() })
  }

  pub fn require_bool(&self, key: &str) -> MixflowResult<bool> {
    let value = self.require(key)?;
    value.as_bool().ok_or_else(|| mismatch(key, "bool", value))
  }

  pub fn require_i64(&self, key: &str) -> MixflowResult<i64> {
    let value = self.require(key)?;
    value.as_i64().ok_or_else(|| mismatch(key, "int", value))
  }

  pub fn require_f64(&self, key: &str) -> MixflowResult<f64> {
    let value = self.require(key)?;
    value.as_f64().ok_or_else(|| mismatch(key, "float", value))
  }

  pub fn require_str(&self, key: &str) -> MixflowResult<&str> {
    let value = self.require(key)?;
    value.as_str().ok_or_else(|| mismatch(key, "string", value))
  }

  pub fn require_map(&self, key: &str) -> MixflowResult<&State> {
    let value = self.require(key)?;
    value.as_map().ok_or_else(|| mismatch(key, "map", value))
  }

  pub fn require_opaque<T: Any + Send + Sync>(&self, key: &str) -> MixflowResult<Arc<T>> {
    let value = self.require(key)?;
    value
      .as_opaque()
      .and_then(Opaque::downcast::<T>)
      .ok_or_else(|| MixflowError::TypeMismatch {
        key: key.to_string(),
        expected: std::any::type_name::<T>().to_string(),
        found: value.as_opaque().map_or(value.kind(), Opaque::type_name).to_string(),
      })
  }

  pub fn to_json(&self) -> serde_json::Value {
    serde_json::Value::Object(self.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect())
  }
}

fn mismatch(key: &str, expected: &str, found: &Value) -> MixflowError {
  MixflowError::TypeMismatch {
    key: key.to_string(),
    expected: expected.to_string(),
    found: found.kind().to_string(),
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for State {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self::from_map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

impl TryFrom<serde_json::Value> for State {
  type Error = MixflowError;

  fn try_from(json: serde_json::Value) -> MixflowResult<Self> {
    match json {
      serde_json::Value::Object(fields) => Ok(fields.into_iter().collect()),
      other => Err(MixflowError::InvalidState(format!(
        "expected a JSON object at the top level, found {}",
        Value::from(other).kind()
      ))),
    }
  }
}

impl fmt::Debug for State {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map().entries(self.0.iter()).finish()
  }
}

impl fmt::Display for State {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_json())
  }
}
