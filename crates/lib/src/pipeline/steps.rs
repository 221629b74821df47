//! Translation of plan steps into builder operations.

use std::io;

use crate::builder::{BuildRequest, DockerfileSource, dockerfiles};
use crate::config::ProjectLayout;
use crate::consts::{DEFAULT_WORKDIR, PACKAGE_LOCKFILE, PACKAGE_MANIFEST};
use crate::context::IgnoreRules;
use crate::plan::{BuildPlan, BuildStep};

use super::types::StepFailure;

/// What the builder is asked to do for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
  /// Optionally pull `image`, then tag it as `tag`.
  Tag { image: String, tag: String, pull: bool },
  /// Build with the shared context narrowed to `rules`.
  Build { rules: IgnoreRules, request: BuildRequest },
}

fn bool_arg(value: bool) -> &'static str {
  if value { "true" } else { "false" }
}

/// The content of a component's own `.dockerignore`, if it has one.
fn component_ignore(layout: &ProjectLayout, component: &str) -> Result<Option<String>, StepFailure> {
  let path = layout.component_ignore_path(component);
  match std::fs::read_to_string(&path) {
    Ok(content) => Ok(Some(content)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(source) => Err(StepFailure::Read { path, source }),
  }
}

/// Narrow to `component` plus the shared defaults and its own ignore patterns.
fn component_rules(rules: IgnoreRules, layout: &ProjectLayout, component: &str) -> Result<IgnoreRules, StepFailure> {
  let rules = rules.defaults();
  Ok(match component_ignore(layout, component)? {
    Some(content) => rules.component_patterns(component, &content),
    None => rules,
  })
}

/// Work out the builder operation for `step` of `plan`.
pub fn step_action(
  plan: &BuildPlan,
  step: &BuildStep,
  layout: &ProjectLayout,
  pull: bool,
) -> Result<StepAction, StepFailure> {
  let context = layout.components_dir();
  let inline = |dockerfile: &'static str, tag: &str| {
    BuildRequest::new(DockerfileSource::Inline(dockerfile), context.clone(), tag.to_string())
  };

  let (rules, request) = match step {
    BuildStep::TagBase => {
      return Ok(StepAction::Tag {
        image: plan.base_image.clone(),
        tag: plan.tag.clone(),
        pull,
      });
    }
    BuildStep::BuilderImage => (
      IgnoreRules::new().ignore_all().include("pip.conf").include("poetry.toml"),
      inline(dockerfiles::BUILDER, &plan.builder_tag)
        .arg("FROM_IMAGE", &plan.builder_image)
        .arg("POETRY_VERSION", &plan.package_manager_version)
        .arg("PACKAGES", plan.packages.join(" ")),
    ),
    BuildStep::AddPackageManager => (
      IgnoreRules::new().ignore_all(),
      inline(dockerfiles::ADD_PACKAGE_MANAGER, &plan.tag)
        .arg("BUILDER_IMAGE", &plan.builder_tag)
        .arg("FROM_IMAGE", &plan.tag),
    ),
    BuildStep::Aladdinize => (
      IgnoreRules::new().ignore_all(),
      inline(dockerfiles::ALADDINIZE, &plan.tag)
        .arg("FROM_IMAGE", &plan.tag)
        .arg("PYTHON_OPTIMIZE", plan.python_optimize())
        .arg("ADD_TO_SUDOERS", bool_arg(plan.user.sudo))
        .arg("CREATE_USER", bool_arg(plan.user.create))
        .arg("USER_NAME", &plan.user.name)
        .arg("USER_GROUP", &plan.user.group)
        .arg("USER_HOME", &plan.user.home)
        .arg("CREATE_WORKDIR", bool_arg(plan.workdir.create))
        .arg("WORKDIR", plan.workdir.path.as_deref().unwrap_or(DEFAULT_WORKDIR)),
    ),
    BuildStep::Overlay => {
      let rules = component_rules(
        IgnoreRules::new().ignore_all().include(&plan.component),
        layout,
        &plan.component,
      )?;
      let dockerfile = DockerfileSource::Path(layout.overlay_path(&plan.component));
      (
        rules,
        BuildRequest::new(dockerfile, context.clone(), plan.tag.clone())
          .arg("BUILDER_IMAGE", &plan.builder_tag)
          .arg("FROM_IMAGE", &plan.tag)
          .arg("PYTHON_OPTIMIZE", plan.python_optimize()),
      )
    }
    BuildStep::Packages { component } => (
      IgnoreRules::new()
        .ignore_all()
        .include("pip.conf")
        .include("poetry.toml")
        .include(format!("{component}/{PACKAGE_MANIFEST}"))
        .include(format!("{component}/{PACKAGE_LOCKFILE}")),
      inline(dockerfiles::ADD_COMPONENT_PACKAGES, &plan.tag)
        .arg("BUILDER_IMAGE", &plan.builder_tag)
        .arg("FROM_IMAGE", &plan.tag)
        .arg("COMPONENT", component)
        .arg("POETRY_NO_DEV", plan.no_dev_flag())
        .arg("PYTHON_OPTIMIZE", plan.python_optimize())
        .arg("USER_HOME", &plan.user.home)
        .arg("USER_CHOWN", plan.user.chown()),
    ),
    BuildStep::Content { component, install } => (
      component_rules(IgnoreRules::new().ignore_all().include(component), layout, component)?,
      inline(dockerfiles::ADD_COMPONENT_CONTENT, &plan.tag)
        .arg("FROM_IMAGE", &plan.tag)
        .arg("COMPONENT", component)
        .arg("POETRY_INSTALL_COMPONENT", bool_arg(*install))
        .arg("PYTHON_OPTIMIZE", plan.python_optimize())
        .arg("USER_CHOWN", plan.user.chown()),
    ),
    BuildStep::LocalBin => (
      IgnoreRules::new().ignore_all(),
      inline(dockerfiles::ADD_LOCAL_BIN, &plan.tag)
        .arg("FROM_IMAGE", &plan.tag)
        .arg("USER_HOME", &plan.user.home),
    ),
    BuildStep::Editor => (
      IgnoreRules::new().ignore_all(),
      inline(dockerfiles::EDITOR, &plan.editor_tag).arg("FROM_IMAGE", &plan.tag),
    ),
  };

  let request = if plan.dev_mode && keeps_purpose_tag(step) {
    request.tag(plan.purpose_tag(step))
  } else {
    request
  };
  Ok(StepAction::Build { rules, request })
}

/// Steps that advance the working tag keep a purpose tag in dev mode.
fn keeps_purpose_tag(step: &BuildStep) -> bool {
  matches!(
    step,
    BuildStep::AddPackageManager
      | BuildStep::Aladdinize
      | BuildStep::Overlay
      | BuildStep::Packages { .. }
      | BuildStep::Content { .. }
  )
}
