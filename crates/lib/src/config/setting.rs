//! Tri-state configuration values.

/// A configuration value that is either explicitly declared or not declared at all.
///
/// `Setting::Unset` is not the same as an empty or false value: several plan
/// defaults depend on whether anything was said, not on what was said.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Setting<T> {
  /// Nothing was declared.
  #[default]
  Unset,
  /// A value was declared explicitly.
  Set(T),
}

impl<T> Setting<T> {
  pub fn is_set(&self) -> bool {
    matches!(self, Setting::Set(_))
  }

  pub fn is_unset(&self) -> bool {
    matches!(self, Setting::Unset)
  }

  pub fn as_ref(&self) -> Setting<&T> {
    match self {
      Setting::Set(value) => Setting::Set(value),
      Setting::Unset => Setting::Unset,
    }
  }

  pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Setting<U> {
    match self {
      Setting::Set(value) => Setting::Set(f(value)),
      Setting::Unset => Setting::Unset,
    }
  }

  /// Returns `self` if set, otherwise `other`.
  pub fn or(self, other: Setting<T>) -> Setting<T> {
    match self {
      Setting::Set(_) => self,
      Setting::Unset => other,
    }
  }

  pub fn unwrap_or(self, default: T) -> T {
    match self {
      Setting::Set(value) => value,
      Setting::Unset => default,
    }
  }

  pub fn unwrap_or_else<F: FnOnce() -> T>(self, f: F) -> T {
    match self {
      Setting::Set(value) => value,
      Setting::Unset => f(),
    }
  }

  pub fn ok_or_else<E, F: FnOnce() -> E>(self, err: F) -> Result<T, E> {
    match self {
      Setting::Set(value) => Ok(value),
      Setting::Unset => Err(err()),
    }
  }

  pub fn into_option(self) -> Option<T> {
    match self {
      Setting::Set(value) => Some(value),
      Setting::Unset => None,
    }
  }
}

impl<T> From<Option<T>> for Setting<T> {
  fn from(value: Option<T>) -> Self {
    match value {
      Some(value) => Setting::Set(value),
      None => Setting::Unset,
    }
  }
}
