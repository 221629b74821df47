//! Filesystem layout of a project.

use std::path::{Path, PathBuf};

use crate::consts::{
  COMPONENTS_DIR, DECLARATION_FILENAME, IGNORE_FILENAME, MANIFEST_FILENAME, OVERLAY_DOCKERFILE, PACKAGE_LOCKFILE,
  PACKAGE_MANIFEST,
};

use super::component::ComponentLayout;
use super::error::ConfigError;

/// Paths within a project rooted at the directory holding `lamp.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
  root: PathBuf,
}

impl ProjectLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Find the project root by walking up from `start` until a `lamp.json` is found.
  pub fn locate(start: &Path) -> Result<Self, ConfigError> {
    let start = dunce::canonicalize(start).map_err(|source| ConfigError::Read {
      path: start.to_path_buf(),
      source,
    })?;

    let root = start
      .ancestors()
      .find(|dir| dir.join(MANIFEST_FILENAME).is_file())
      .map(Path::to_path_buf);

    match root {
      Some(root) => Ok(Self::new(root)),
      None => Err(ConfigError::ManifestNotFound {
        manifest: MANIFEST_FILENAME,
        start,
      }),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.root.join(MANIFEST_FILENAME)
  }

  /// The shared build context handed to the image builder.
  pub fn components_dir(&self) -> PathBuf {
    self.root.join(COMPONENTS_DIR)
  }

  pub fn component_dir(&self, component: &str) -> PathBuf {
    self.components_dir().join(component)
  }

  pub fn declaration_path(&self, component: &str) -> PathBuf {
    self.component_dir(component).join(DECLARATION_FILENAME)
  }

  pub fn overlay_path(&self, component: &str) -> PathBuf {
    self.component_dir(component).join(OVERLAY_DOCKERFILE)
  }

  pub fn component_ignore_path(&self, component: &str) -> PathBuf {
    self.component_dir(component).join(IGNORE_FILENAME)
  }

  /// All components physically present, in sorted order.
  ///
  /// Directories starting with `_` or `.` are not components.
  pub fn list_components(&self) -> Result<Vec<String>, ConfigError> {
    let dir = self.components_dir();
    let entries = match std::fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => return Err(ConfigError::Read { path: dir, source }),
    };

    let mut components = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|source| ConfigError::Read {
        path: dir.clone(),
        source,
      })?;
      if !entry.path().is_dir() {
        continue;
      }
      let Some(name) = entry.file_name().to_str().map(str::to_string) else {
        continue;
      };
      if name.starts_with('_') || name.starts_with('.') {
        continue;
      }
      components.push(name);
    }

    components.sort();
    Ok(components)
  }

  pub fn component_layout(&self, component: &str) -> ComponentLayout {
    let dir = self.component_dir(component);
    ComponentLayout {
      has_declaration: dir.join(DECLARATION_FILENAME).is_file(),
      has_overlay: dir.join(OVERLAY_DOCKERFILE).is_file(),
      is_package_managed: dir.join(PACKAGE_MANIFEST).is_file() && dir.join(PACKAGE_LOCKFILE).is_file(),
      has_ignore_file: dir.join(IGNORE_FILENAME).is_file(),
    }
  }
}
