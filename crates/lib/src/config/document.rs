//! Dotted-path lookup over a parsed YAML document.

use serde_yaml::Value;

use super::setting::Setting;

/// A parsed declaration document.
///
/// Lookups walk nested mappings one dot-separated segment at a time. A missing
/// segment, a non-mapping intermediate, or an explicit `null` leaf all resolve
/// to [`Setting::Unset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
  root: Value,
}

impl ConfigDocument {
  /// Wrap an already parsed value. A `null` document is treated as empty.
  pub fn new(root: Value) -> Self {
    let root = match root {
      Value::Null => Value::Mapping(Default::default()),
      other => other,
    };
    Self { root }
  }

  /// Parse a YAML document. The top level must be a mapping (or empty).
  pub fn from_yaml_str(source: &str) -> Result<Self, String> {
    let root: Value = serde_yaml::from_str(source).map_err(|e| e.to_string())?;
    match root {
      Value::Null | Value::Mapping(_) => Ok(Self::new(root)),
      _ => Err("top level of the document must be a mapping".to_string()),
    }
  }

  pub fn is_empty(&self) -> bool {
    match &self.root {
      Value::Mapping(map) => map.is_empty(),
      _ => true,
    }
  }

  /// Look up a dotted path such as `image.user.name`.
  pub fn get(&self, path: &str) -> Setting<&Value> {
    let mut current = &self.root;
    for segment in path.split('.') {
      let Value::Mapping(map) = current else {
        return Setting::Unset;
      };
      match map.get(segment) {
        Some(next) => current = next,
        None => return Setting::Unset,
      }
    }

    match current {
      Value::Null => Setting::Unset,
      value => Setting::Set(value),
    }
  }

  /// Look up a dotted path, falling back to `default` when nothing is declared.
  pub fn get_or<'a>(&'a self, path: &str, default: Setting<&'a Value>) -> Setting<&'a Value> {
    self.get(path).or(default)
  }
}
