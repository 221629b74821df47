use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid or contradictory project configuration.
///
/// Configuration errors are always fatal. When detected while loading or
/// validating the dependency graph they surface before any image is built.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("could not find {manifest} in {start} or any parent directory")]
  ManifestNotFound { manifest: &'static str, start: PathBuf },

  #[error("failed to read {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid project manifest {path}: {message}")]
  InvalidManifest { path: PathBuf, message: String },

  #[error("invalid component.yaml for component '{component}': {message}")]
  InvalidDeclaration { component: String, message: String },

  #[error("invalid value for {field} in component '{component}': expected {expected}")]
  InvalidField {
    component: String,
    field: &'static str,
    expected: &'static str,
  },

  #[error("component '{component}' depends on unknown component '{dependency}'")]
  UnknownDependency { component: String, dependency: String },

  #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
  Cycle { cycle: Vec<String> },

  #[error("component '{0}' does not exist")]
  UnknownComponent(String),

  #[error("component '{component}' must declare {field} when it specifies a custom image.base")]
  MissingField { component: String, field: &'static str },

  #[error("unsupported language for component '{component}': {language}")]
  UnsupportedLanguage { component: String, language: String },

  #[error("unsupported {language} version for component '{component}': {version}")]
  UnsupportedLanguageVersion {
    component: String,
    language: String,
    version: String,
  },
}

impl ConfigError {
  /// The component this error is about, when there is a single one.
  pub fn component(&self) -> Option<&str> {
    match self {
      ConfigError::InvalidDeclaration { component, .. }
      | ConfigError::InvalidField { component, .. }
      | ConfigError::UnknownDependency { component, .. }
      | ConfigError::MissingField { component, .. }
      | ConfigError::UnsupportedLanguage { component, .. }
      | ConfigError::UnsupportedLanguageVersion { component, .. } => Some(component),
      ConfigError::UnknownComponent(component) => Some(component),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cycle_display_names_every_node() {
    let err = ConfigError::Cycle {
      cycle: vec!["a".into(), "b".into(), "c".into(), "a".into()],
    };
    assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> c -> a");
    assert_eq!(err.component(), None);
  }

  #[test]
  fn missing_field_names_component() {
    let err = ConfigError::MissingField {
      component: "web".into(),
      field: "image.user.name",
    };
    assert!(err.to_string().contains("'web'"));
    assert!(err.to_string().contains("image.user.name"));
    assert_eq!(err.component(), Some("web"));
  }
}
