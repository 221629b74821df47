//! The project manifest (`lamp.json`).

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::ConfigError;

/// Project-level declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
  pub name: String,

  /// Image names produced by the project, usually `{name}-{component}`.
  #[serde(default, rename = "docker_images", deserialize_with = "one_or_many")]
  pub published_images: Vec<String>,

  /// A custom build command that replaces component orchestration entirely.
  #[serde(
    default,
    rename = "build_docker",
    deserialize_with = "optional_one_or_many",
    skip_serializing_if = "Option::is_none"
  )]
  pub build_command: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
  fn from(value: OneOrMany) -> Self {
    match value {
      OneOrMany::One(s) => vec![s],
      OneOrMany::Many(v) => v,
    }
  }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
  Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(Vec::from).unwrap_or_default())
}

fn optional_one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<String>>, D::Error> {
  Ok(
    Option::<OneOrMany>::deserialize(deserializer)?
      .map(Vec::from)
      .filter(|cmd| !cmd.is_empty()),
  )
}

impl ProjectManifest {
  pub fn from_json_str(path: &Path, source: &str) -> Result<Self, ConfigError> {
    let manifest: ProjectManifest = serde_json::from_str(source).map_err(|e| ConfigError::InvalidManifest {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;

    if manifest.name.trim().is_empty() {
      return Err(ConfigError::InvalidManifest {
        path: path.to_path_buf(),
        message: "name must not be empty".to_string(),
      });
    }

    Ok(manifest)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json_str(path, &source)
  }

  /// Component names behind the published images, with the `{name}-` prefix stripped.
  pub fn published_components(&self) -> Vec<String> {
    let prefix = format!("{}-", self.name);
    let mut components: Vec<String> = Vec::new();
    for image in &self.published_images {
      let component = image.strip_prefix(&prefix).unwrap_or(image).to_string();
      if !components.contains(&component) {
        components.push(component);
      }
    }
    components
  }

  /// The image name a component is published under.
  pub fn image_name(&self, component: &str) -> String {
    format!("{}-{}", self.name, component)
  }
}
