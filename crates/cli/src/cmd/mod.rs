mod build;
mod plan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::debug;

use lampbuild_lib::config::{ConfigStore, ProjectLayout};
use lampbuild_lib::consts::{DEFAULT_LANGUAGE_VERSION, DEFAULT_PACKAGE_MANAGER_VERSION, LOCAL_HASH};
use lampbuild_lib::pipeline::Selection;
use lampbuild_lib::plan::PlanConfig;

pub use build::{BuildArgs, cmd_build};
pub use plan::cmd_plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectArg {
  /// Every component in the project
  All,
  /// Components whose images lamp.json publishes
  Published,
  /// All for local builds, published otherwise
  Auto,
}

/// Options shared by every command that works on a project.
#[derive(Debug, Args)]
pub struct ProjectArgs {
  /// Components to build; their dependencies are always included
  #[arg(required_unless_present = "select", conflicts_with = "select")]
  pub components: Vec<String>,

  /// Select components by policy instead of naming them
  #[arg(long, value_enum)]
  pub select: Option<SelectArg>,

  /// Build hash used as the image tag; `local` builds development images
  #[arg(long, env = "HASH", default_value = LOCAL_HASH)]
  pub hash: String,

  /// Project directory (default: search upwards from the current directory)
  #[arg(long)]
  pub project: Option<PathBuf>,

  /// Python version for components that do not declare one
  #[arg(long, default_value = DEFAULT_LANGUAGE_VERSION)]
  pub default_python_version: String,

  /// Poetry version installed into images
  #[arg(long, default_value = DEFAULT_PACKAGE_MANAGER_VERSION)]
  pub default_poetry_version: String,
}

impl ProjectArgs {
  pub fn selection(&self) -> Selection {
    match self.select {
      _ if !self.components.is_empty() => Selection::Explicit(self.components.clone()),
      Some(SelectArg::Published) => Selection::Published,
      Some(SelectArg::Auto) => Selection::Auto,
      Some(SelectArg::All) | None => Selection::All,
    }
  }

  pub fn plan_config(&self) -> PlanConfig {
    PlanConfig {
      hash: self.hash.clone(),
      default_language_version: self.default_python_version.clone(),
      default_package_manager_version: self.default_poetry_version.clone(),
    }
  }

  pub fn load(&self) -> Result<ConfigStore> {
    let start = match &self.project {
      Some(dir) => dir.clone(),
      None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let layout = ProjectLayout::locate(&start)?;
    let store = ConfigStore::load(layout)?;
    debug!(
      root = %store.layout().root().display(),
      components = store.components().len(),
      "loaded project"
    );
    Ok(store)
  }
}
