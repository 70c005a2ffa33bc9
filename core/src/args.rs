// mixflow/src/args.rs

//! Command-line style configuration as a pipeline mixin.
//!
//! `ArgList` turns `--name value` pairs into a partial [`State`], filling in
//! defaults for anything not supplied. It is usually the first stage of a
//! script's pipeline:
//!
//! ```
//! use mixflow::{ArgList, Pipeline, State};
//!
//! let defaults: State = [("unlockSeconds", 1), ("testAccountIndex", 0)].into_iter().collect();
//! let args = ArgList::new(defaults).with_tokens(["deploy.rs", "--unlockSeconds", "30"]);
//!
//! let parsed = args.parse();
//! assert_eq!(parsed.require_i64("unlockSeconds").unwrap(), 30);
//! assert_eq!(parsed.require_i64("testAccountIndex").unwrap(), 0);
//!
//! let mut pipeline = Pipeline::<State>::new();
//! pipeline.then_transform("args", args);
//! ```

use crate::core::merge::DeepMerge;
use crate::core::mixin::Transform;
use crate::core::state::{State, Value};
use async_trait::async_trait;
use tracing::{event, Level};

/// Parses `--key value` / `--flag` tokens into a partial state.
#[derive(Debug, Clone, Default)]
pub struct ArgList {
  defaults: State,
  tokens: Vec<String>,
}

impl ArgList {
  /// An argument list with the given defaults and no tokens yet.
  pub fn new(defaults: State) -> Self {
    Self {
      defaults,
      tokens: Vec::new(),
    }
  }

  /// Reads tokens from the current process arguments.
  pub fn from_process_args(defaults: State) -> Self {
    Self::new(defaults).with_tokens(std::env::args())
  }

  #[must_use]
  pub fn with_tokens<I, T>(mut self, tokens: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.tokens = tokens.into_iter().map(Into::into).collect();
    self
  }

  pub fn defaults(&self) -> &State {
    &self.defaults
  }

  /// Parses the tokens and fills in defaults.
  ///
  /// Everything before the first `--`-prefixed token (program name, script
  /// path) is skipped. A `--key` followed by a non-flag token binds that token's
  /// converted value; a `--key` followed by another flag, or by nothing, binds
  /// `true`. Parsing stops at the first positional token after that. A bare
  /// `--` also ends parsing.
  pub fn parse(&self) -> State {
    let mut supplied: Vec<(String, Value)> = Vec::new();
    let mut rest = self.tokens.iter().skip_while(|t| !t.starts_with("--")).peekable();

    while let Some(token) = rest.next() {
      let key = match token.strip_prefix("--") {
        Some("") => {
          event!(Level::DEBUG, "End of options marker; remaining tokens ignored.");
          break;
        }
        Some(key) => key,
        None => {
          let ignored: Vec<&str> = std::iter::once(token.as_str()).chain(rest.by_ref().map(String::as_str)).collect();
          event!(Level::WARN, ?ignored, "Ignoring positional args.");
          break;
        }
      };

      let value = match rest.peek() {
        Some(next) if !next.starts_with("--") => {
          let value = parse_value(next);
          rest.next();
          value
        }
        _ => Value::Bool(true),
      };
      event!(Level::DEBUG, key, ?value, "Found arg.");
      supplied.push((key.to_string(), value));
    }

    // Later duplicates overwrite earlier ones; supplied values beat defaults.
    let supplied: State = supplied.into_iter().collect();
    let final_args = self.defaults.deep_merge(&supplied);
    event!(Level::DEBUG, args = %final_args, "Arguments parsed.");
    final_args
  }
}

/// Converts a raw argument into the most specific value it represents.
///
/// `0x`-prefixed text (addresses, hashes) is always kept as a string.
pub fn parse_value(raw: &str) -> Value {
  if raw.starts_with("0x") {
    return Value::Str(raw.to_string());
  }
  if let Ok(int) = raw.parse::<i64>() {
    return Value::Int(int);
  }
  match raw.parse::<f64>() {
    Ok(float) if float.is_finite() => Value::Float(float),
    _ => Value::Str(raw.to_string()),
  }
}

#[async_trait]
impl<Err> Transform<State, Err> for ArgList
where
  Err: Send + 'static,
{
  async fn apply(&self, _state: State) -> Result<State, Err> {
    Ok(self.parse())
  }
}
