use std::collections::BTreeSet;

use tracing::debug;

use crate::config::{ComponentDeclaration, ConfigError, ConfigStore};
use crate::consts::{DEFAULT_LANGUAGE, DEFAULT_USER_NAME, DEFAULT_WORKDIR};
use crate::graph::DependencyGraph;

use super::types::{BuildPlan, BuildStep, PlanConfig, UserInfo, Workdir};

/// Collapses component declarations into build plans.
pub struct PlanResolver<'a> {
  store: &'a ConfigStore,
  graph: &'a DependencyGraph,
  config: &'a PlanConfig,
}

impl<'a> PlanResolver<'a> {
  pub fn new(store: &'a ConfigStore, graph: &'a DependencyGraph, config: &'a PlanConfig) -> Self {
    Self { store, graph, config }
  }

  /// Resolve the plan for `component`.
  ///
  /// Fails with a [`ConfigError`] naming the component when its declaration
  /// is contradictory or unsupported.
  pub fn resolve(&self, component: &str) -> Result<BuildPlan, ConfigError> {
    let decl = self
      .store
      .component(component)
      .ok_or_else(|| ConfigError::UnknownComponent(component.to_string()))?;

    let project = self.store.manifest().name.clone();
    let hash = self.config.hash.clone();
    let dev_mode = self.config.is_dev();

    let language = decl.language_name.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    if language != DEFAULT_LANGUAGE {
      return Err(ConfigError::UnsupportedLanguage {
        component: component.to_string(),
        language,
      });
    }
    let language_version = decl
      .language_version
      .clone()
      .unwrap_or_else(|| self.config.default_language_version.clone());
    if language_version != "3" && !language_version.starts_with("3.") {
      return Err(ConfigError::UnsupportedLanguageVersion {
        component: component.to_string(),
        language,
        version: language_version,
      });
    }

    let builder_image = format!("python:{}-slim", major_minor(&language_version));
    let custom_base = decl.base_image.is_set();
    let base_image = decl.base_image.clone().unwrap_or_else(|| builder_image.clone());

    let aladdinize = decl.aladdinize.unwrap_or(!custom_base);
    let package_manager = decl.package_manager.unwrap_or(!custom_base);

    let user = resolve_user(decl, custom_base, aladdinize, dev_mode)?;
    let workdir = Workdir {
      create: decl.workdir.create.unwrap_or(aladdinize),
      path: decl
        .workdir
        .path
        .clone()
        .into_option()
        .or_else(|| aladdinize.then(|| DEFAULT_WORKDIR.to_string())),
    };

    let transitive_dependencies = self.graph.transitive_dependencies(component)?;
    let steps = self.steps(decl, &transitive_dependencies, aladdinize, package_manager, dev_mode);

    let image = format!("{project}-{component}");
    let plan = BuildPlan {
      tag: format!("{image}:{hash}"),
      editor_tag: format!("{image}:editor"),
      builder_tag: format!("{image}:builder"),
      project,
      component: component.to_string(),
      hash,
      dev_mode,
      language,
      language_version,
      package_manager_version: self.config.default_package_manager_version.clone(),
      base_image,
      builder_image,
      aladdinize,
      package_manager,
      user,
      workdir,
      packages: decl.packages.clone(),
      transitive_dependencies,
      steps,
    };

    debug!(
      component = %plan.component,
      tag = %plan.tag,
      base = %plan.base_image,
      steps = plan.steps.len(),
      "resolved build plan"
    );
    Ok(plan)
  }

  fn is_package_managed(&self, component: &str) -> bool {
    self
      .store
      .component(component)
      .is_some_and(|decl| decl.layout.is_package_managed)
  }

  fn steps(
    &self,
    decl: &ComponentDeclaration,
    dependencies: &[String],
    aladdinize: bool,
    package_manager: bool,
    dev_mode: bool,
  ) -> Vec<BuildStep> {
    let component = decl.name.as_str();
    let own_packages = decl.layout.is_package_managed;

    let mut steps = vec![BuildStep::TagBase];

    let any_packages = own_packages || dependencies.iter().any(|dep| self.is_package_managed(dep));
    if package_manager || any_packages {
      steps.push(BuildStep::BuilderImage);
    }
    if package_manager {
      steps.push(BuildStep::AddPackageManager);
    }
    if aladdinize {
      steps.push(BuildStep::Aladdinize);
    }
    if decl.layout.has_overlay {
      steps.push(BuildStep::Overlay);
    }

    let mut seen = BTreeSet::new();
    for dep in dependencies.iter().filter(|dep| seen.insert(dep.as_str())) {
      if self.is_package_managed(dep) {
        steps.push(BuildStep::Packages { component: dep.clone() });
      }
      steps.push(BuildStep::Content {
        component: dep.clone(),
        install: false,
      });
    }

    if own_packages {
      steps.push(BuildStep::Packages {
        component: component.to_string(),
      });
    }
    steps.push(BuildStep::Content {
      component: component.to_string(),
      install: own_packages,
    });

    if package_manager {
      steps.push(BuildStep::LocalBin);
    }
    if dev_mode {
      steps.push(BuildStep::Editor);
    }
    steps
  }
}

fn resolve_user(
  decl: &ComponentDeclaration,
  custom_base: bool,
  aladdinize: bool,
  dev_mode: bool,
) -> Result<UserInfo, ConfigError> {
  // A custom base image that we do not aladdinize has an unknown runtime user.
  if custom_base && !aladdinize {
    if decl.user.name.is_unset() {
      return Err(ConfigError::MissingField {
        component: decl.name.clone(),
        field: "image.user.name",
      });
    }
    if decl.user.group.is_unset() {
      return Err(ConfigError::MissingField {
        component: decl.name.clone(),
        field: "image.user.group",
      });
    }
  }

  let name = decl.user.name.clone().unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
  let group = decl.user.group.clone().unwrap_or_else(|| name.clone());
  let home = decl.user.home.clone().unwrap_or_else(|| format!("/home/{name}"));

  Ok(UserInfo {
    create: decl.user.create.unwrap_or(aladdinize),
    sudo: decl.user.sudo.unwrap_or(dev_mode),
    name,
    group,
    home,
  })
}

/// Keep the first two dot-separated segments of a version: `3.8.10` -> `3.8`.
pub fn major_minor(version: &str) -> String {
  version.split('.').take(2).collect::<Vec<_>>().join(".")
}
