use serde::Serialize;

use crate::consts::{DEFAULT_LANGUAGE_VERSION, DEFAULT_PACKAGE_MANAGER_VERSION, LOCAL_HASH};

/// Invocation-wide inputs to plan resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
  /// Build hash used as the image tag. `local` selects dev mode.
  pub hash: String,

  /// Language version for components that do not declare one.
  pub default_language_version: String,

  /// Package manager (poetry) version installed into images.
  pub default_package_manager_version: String,
}

impl PlanConfig {
  pub fn new(hash: impl Into<String>) -> Self {
    Self {
      hash: hash.into(),
      ..Default::default()
    }
  }

  pub fn is_dev(&self) -> bool {
    self.hash == LOCAL_HASH
  }
}

impl Default for PlanConfig {
  fn default() -> Self {
    Self {
      hash: LOCAL_HASH.to_string(),
      default_language_version: DEFAULT_LANGUAGE_VERSION.to_string(),
      default_package_manager_version: DEFAULT_PACKAGE_MANAGER_VERSION.to_string(),
    }
  }
}

/// The user an image runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
  /// Whether the boilerplate step creates this user.
  pub create: bool,
  pub name: String,
  pub group: String,
  pub home: String,
  pub sudo: bool,
}

impl UserInfo {
  /// `name:group`, as used by `COPY --chown`.
  pub fn chown(&self) -> String {
    format!("{}:{}", self.name, self.group)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workdir {
  pub create: bool,
  /// `None` keeps whatever working directory the base image set.
  pub path: Option<String>,
}

/// One builder invocation in a component's image assembly.
///
/// Every step after `TagBase` reads the component's working tag and moves it
/// to the image it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum BuildStep {
  /// Pull the base image and tag it as the working tag.
  TagBase,
  /// Build the builder-stage image used to compile packages.
  BuilderImage,
  /// Layer the package manager into the working tag.
  AddPackageManager,
  /// Create the runtime user and working directory.
  Aladdinize,
  /// Apply the component's own Dockerfile.
  Overlay,
  /// Install a component's locked packages via the builder image.
  Packages { component: String },
  /// Copy a component's content; `install` runs the final install pass.
  Content { component: String, install: bool },
  /// Put the user's `~/.local/bin` on `PATH`.
  LocalBin,
  /// Build the editor image with entrypoint and command cleared.
  Editor,
}

impl BuildStep {
  /// Short label used in logs and dev-mode purpose tags.
  pub fn purpose(&self) -> String {
    match self {
      BuildStep::TagBase => "tag-base".to_string(),
      BuildStep::BuilderImage => "builder".to_string(),
      BuildStep::AddPackageManager => "add-poetry".to_string(),
      BuildStep::Aladdinize => "aladdinize".to_string(),
      BuildStep::Overlay => "overlay".to_string(),
      BuildStep::Packages { component } => format!("add-{component}-packages"),
      BuildStep::Content { component, .. } => format!("add-{component}-content"),
      BuildStep::LocalBin => "local-bin".to_string(),
      BuildStep::Editor => "editor".to_string(),
    }
  }
}

impl std::fmt::Display for BuildStep {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.purpose())
  }
}

/// The resolved recipe for one component's image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
  pub project: String,
  pub component: String,
  pub hash: String,
  /// `{project}-{component}:{hash}`
  pub tag: String,
  /// `{project}-{component}:editor`
  pub editor_tag: String,
  /// `{project}-{component}:builder`
  pub builder_tag: String,
  pub dev_mode: bool,
  pub language: String,
  pub language_version: String,
  pub package_manager_version: String,
  pub base_image: String,
  pub builder_image: String,
  pub aladdinize: bool,
  pub package_manager: bool,
  pub user: UserInfo,
  pub workdir: Workdir,
  /// System packages for the builder image.
  pub packages: Vec<String>,
  /// Components whose artifacts are copied in, dependencies first.
  pub transitive_dependencies: Vec<String>,
  pub steps: Vec<BuildStep>,
}

impl BuildPlan {
  fn image(&self) -> String {
    format!("{}-{}", self.project, self.component)
  }

  /// Extra tag preserving an intermediate image, e.g. `shop-web-aladdinize:local`.
  pub fn purpose_tag(&self, step: &BuildStep) -> String {
    format!("{}-{}:{}", self.image(), step.purpose(), self.hash)
  }

  /// The tags this plan leaves behind as the component's images.
  pub fn output_tags(&self) -> Vec<String> {
    let mut tags = vec![self.tag.clone()];
    if self.steps.contains(&BuildStep::Editor) {
      tags.push(self.editor_tag.clone());
    }
    tags
  }

  /// Value for `PYTHON_OPTIMIZE`; dev builds skip bytecode optimisation.
  pub fn python_optimize(&self) -> &'static str {
    if self.dev_mode { "" } else { "-O" }
  }

  /// Value for `POETRY_NO_DEV`; dev builds keep development dependencies.
  pub fn no_dev_flag(&self) -> &'static str {
    if self.dev_mode { "" } else { "--no-dev" }
  }
}
