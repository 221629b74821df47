//! Shared helpers for pipeline tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lampbuild_lib::builder::{BuildRequest, BuilderError, DockerfileSource, ImageBuilder};
use lampbuild_lib::config::{ConfigStore, ProjectLayout};
use lampbuild_lib::pipeline::{BuildConfig, Selection};
use lampbuild_lib::plan::PlanConfig;
use tempfile::TempDir;

/// One call made to the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Pull(String),
  Tag(String, String),
  Build {
    tags: Vec<String>,
    args: BTreeMap<String, String>,
    dockerfile: DockerfileSource,
    /// The ignore-list as the builder saw it, if there was one.
    ignore: Option<String>,
  },
}

impl Call {
  pub fn tags(&self) -> Vec<String> {
    match self {
      Call::Pull(_) => vec![],
      Call::Tag(_, target) => vec![target.clone()],
      Call::Build { tags, .. } => tags.clone(),
    }
  }

  pub fn mentions(&self, needle: &str) -> bool {
    match self {
      Call::Pull(image) => image.contains(needle),
      Call::Tag(source, target) => source.contains(needle) || target.contains(needle),
      Call::Build { tags, .. } => tags.iter().any(|t| t.contains(needle)),
    }
  }
}

/// An [`ImageBuilder`] that records every call instead of running docker.
#[derive(Default)]
pub struct FakeBuilder {
  calls: Mutex<Vec<Call>>,
  fail_on: Option<String>,
  hang_on: Option<String>,
}

impl FakeBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fail any build with a tag containing `needle`.
  pub fn failing_on(needle: &str) -> Self {
    Self {
      fail_on: Some(needle.to_string()),
      ..Self::default()
    }
  }

  /// Never finish any build with a tag containing `needle`.
  pub fn hanging_on(needle: &str) -> Self {
    Self {
      hang_on: Some(needle.to_string()),
      ..Self::default()
    }
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn builds(&self) -> Vec<Call> {
    self
      .calls()
      .into_iter()
      .filter(|c| matches!(c, Call::Build { .. }))
      .collect()
  }

  /// Index of the first call mentioning `needle`.
  pub fn position(&self, needle: &str) -> Option<usize> {
    self.calls().iter().position(|c| c.mentions(needle))
  }

  fn record(&self, call: Call) {
    self.calls.lock().unwrap().push(call);
  }
}

impl ImageBuilder for FakeBuilder {
  async fn pull(&self, image: &str) -> Result<(), BuilderError> {
    self.record(Call::Pull(image.to_string()));
    Ok(())
  }

  async fn tag(&self, source: &str, target: &str) -> Result<(), BuilderError> {
    self.record(Call::Tag(source.to_string(), target.to_string()));
    Ok(())
  }

  async fn build(&self, request: &BuildRequest) -> Result<(), BuilderError> {
    let ignore = std::fs::read_to_string(request.context.join(".dockerignore")).ok();
    self.record(Call::Build {
      tags: request.tags.clone(),
      args: request.build_args.clone(),
      dockerfile: request.dockerfile.clone(),
      ignore,
    });

    let matches = |needle: &Option<String>| {
      needle
        .as_deref()
        .is_some_and(|n| request.tags.iter().any(|t| t.contains(n)))
    };
    if matches(&self.hang_on) {
      std::future::pending::<()>().await;
    }
    if matches(&self.fail_on) {
      return Err(BuilderError::Failed {
        command: format!("docker build --tag {}", request.primary_tag()),
        code: Some(1),
      });
    }
    Ok(())
  }
}

/// A project on disk.
pub struct TestProject {
  pub temp: TempDir,
}

impl TestProject {
  pub fn new(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let project = Self { temp };
    project.write("lamp.json", &format!(r#"{{"name": "{name}"}}"#));
    std::fs::create_dir_all(project.components_dir()).unwrap();
    project
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn components_dir(&self) -> PathBuf {
    self.root().join("components")
  }

  pub fn write(&self, relative: &str, content: &str) {
    let path = self.root().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }

  /// Add a component with the given `component.yaml`.
  pub fn component(&self, name: &str, declaration: &str) -> &Self {
    self.write(&format!("components/{name}/component.yaml"), declaration);
    self
  }

  /// Make a component package-managed.
  pub fn packaged(&self, name: &str) -> &Self {
    self.write(&format!("components/{name}/pyproject.toml"), "[tool.poetry]\n");
    self.write(&format!("components/{name}/poetry.lock"), "");
    self
  }

  pub fn ignore_file(&self) -> Option<String> {
    std::fs::read_to_string(self.components_dir().join(".dockerignore")).ok()
  }

  pub fn store(&self) -> ConfigStore {
    ConfigStore::load(ProjectLayout::new(self.root())).unwrap()
  }
}

pub fn config(hash: &str, selection: Selection) -> BuildConfig {
  BuildConfig::new(PlanConfig::new(hash), selection)
}

pub fn explicit(names: &[&str]) -> Selection {
  Selection::Explicit(names.iter().map(|n| n.to_string()).collect())
}
