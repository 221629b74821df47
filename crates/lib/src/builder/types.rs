use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Where a build reads its Dockerfile from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerfileSource {
  /// Embedded text, piped to the builder.
  Inline(&'static str),
  /// A Dockerfile on disk, such as a component overlay.
  Path(PathBuf),
}

/// One `docker build` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub dockerfile: DockerfileSource,
  pub context: PathBuf,
  /// Every tag applied to the result. The first is the primary one.
  pub tags: Vec<String>,
  pub build_args: BTreeMap<String, String>,
}

impl BuildRequest {
  pub fn new(dockerfile: DockerfileSource, context: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
    Self {
      dockerfile,
      context: context.into(),
      tags: vec![tag.into()],
      build_args: BTreeMap::new(),
    }
  }

  pub fn tag(mut self, tag: impl Into<String>) -> Self {
    self.tags.push(tag.into());
    self
  }

  pub fn arg(mut self, key: &str, value: impl Into<String>) -> Self {
    self.build_args.insert(key.to_string(), value.into());
    self
  }

  pub fn primary_tag(&self) -> &str {
    self.tags.first().map(String::as_str).unwrap_or_default()
  }
}

#[derive(Debug, Error)]
pub enum BuilderError {
  #[error("failed to run {program}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("`{command}` {}", describe_exit(.code))]
  Failed { command: String, code: Option<i32> },

  #[error("i/o error while running {program}")]
  Io {
    program: String,
    #[source]
    source: io::Error,
  },
}

fn describe_exit(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("failed with exit code {code}"),
    None => "was terminated by a signal".to_string(),
  }
}

/// The external tool that pulls, tags, and builds images.
pub trait ImageBuilder {
  fn pull(&self, image: &str) -> impl Future<Output = Result<(), BuilderError>>;

  fn tag(&self, source: &str, target: &str) -> impl Future<Output = Result<(), BuilderError>>;

  fn build(&self, request: &BuildRequest) -> impl Future<Output = Result<(), BuilderError>>;
}
