//! Configuration, errors, and results of a pipeline run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::builder::BuilderError;
use crate::config::ConfigError;
use crate::context::{ContextLockError, ContextScopeError};
use crate::plan::PlanConfig;

/// Which components to build when none are named.
///
/// There is deliberately no default: callers must pick one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
  /// Every component under `components/`.
  All,
  /// Components whose images the manifest publishes.
  Published,
  /// `All` for dev builds, `Published` otherwise.
  Auto,
  /// Exactly these components, plus their dependencies.
  Explicit(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
  pub plan: PlanConfig,
  pub selection: Selection,
  /// Pull base images before tagging them.
  pub pull_base: bool,
  /// Upper bound on a single builder invocation.
  pub step_timeout: Option<Duration>,
}

impl BuildConfig {
  pub fn new(plan: PlanConfig, selection: Selection) -> Self {
    Self {
      plan,
      selection,
      pull_base: true,
      step_timeout: None,
    }
  }
}

/// Why a single build step did not complete.
#[derive(Debug, Error)]
pub enum StepFailure {
  #[error(transparent)]
  Builder(#[from] BuilderError),

  #[error("timed out after {0:?}")]
  TimedOut(Duration),

  #[error(transparent)]
  Context(#[from] ContextScopeError),

  #[error("failed to read {path}")]
  Read {
    path: std::path::PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A build step failed. Fatal to the pipeline; earlier images stay tagged.
#[derive(Debug, Error)]
#[error("step '{step}' of component '{component}' failed")]
pub struct BuildStepError {
  pub component: String,
  pub step: String,
  #[source]
  pub cause: StepFailure,
}

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Step(#[from] BuildStepError),

  #[error(transparent)]
  Context(#[from] ContextScopeError),

  #[error(transparent)]
  Lock(#[from] ContextLockError),
}

impl PipelineError {
  pub fn component(&self) -> Option<&str> {
    match self {
      PipelineError::Config(e) => e.component(),
      PipelineError::Step(e) => Some(&e.component),
      PipelineError::Context(_) | PipelineError::Lock(_) => None,
    }
  }

  pub fn step(&self) -> Option<&str> {
    match self {
      PipelineError::Step(e) => Some(&e.step),
      _ => None,
    }
  }
}

/// Render an error and its sources on one line, outermost first.
pub fn error_chain(error: &dyn std::error::Error) -> String {
  let mut out = error.to_string();
  let mut source = error.source();
  while let Some(cause) = source {
    out.push_str(": ");
    out.push_str(&cause.to_string());
    source = cause.source();
  }
  out
}

/// Where a component is in its build.
///
/// `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ComponentState {
  Pending,
  Resolving,
  Building { step: usize, label: String },
  Succeeded,
  Failed,
}

impl ComponentState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, ComponentState::Succeeded | ComponentState::Failed)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltComponent {
  pub component: String,
  /// Final image tags, e.g. `shop-web:local` and `shop-web:editor`.
  pub tags: Vec<String>,
}

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct BuildReport {
  /// Build order for the run, dependencies first.
  pub order: Vec<String>,
  /// Successfully built components, in build order.
  pub built: Vec<BuiltComponent>,
  /// The component that stopped the run and why.
  pub failed: Option<(String, PipelineError)>,
  /// Components never started because of an earlier failure.
  pub skipped: Vec<String>,
  pub states: BTreeMap<String, ComponentState>,
}

impl BuildReport {
  pub fn new(order: Vec<String>) -> Self {
    let states = order
      .iter()
      .map(|component| (component.clone(), ComponentState::Pending))
      .collect();
    Self {
      order,
      built: Vec::new(),
      failed: None,
      skipped: Vec::new(),
      states,
    }
  }

  pub fn is_success(&self) -> bool {
    self.failed.is_none() && self.skipped.is_empty()
  }

  pub fn state(&self, component: &str) -> Option<&ComponentState> {
    self.states.get(component)
  }

  pub(crate) fn transition(&mut self, component: &str, state: ComponentState) {
    if let Some(current) = self.states.get_mut(component)
      && !current.is_terminal()
    {
      *current = state;
    }
  }

  pub(crate) fn succeed(&mut self, component: &str, tags: Vec<String>) {
    self.transition(component, ComponentState::Succeeded);
    self.built.push(BuiltComponent {
      component: component.to_string(),
      tags,
    });
  }

  pub(crate) fn fail(&mut self, component: &str, error: PipelineError) {
    self.transition(component, ComponentState::Failed);
    self.failed = Some((component.to_string(), error));
  }

  pub(crate) fn skip(&mut self, components: &[String]) {
    self.skipped.extend(components.iter().cloned());
  }

  /// Turn a failed report into its error.
  pub fn into_result(self) -> Result<Vec<BuiltComponent>, PipelineError> {
    match self.failed {
      Some((_, error)) => Err(error),
      None => Ok(self.built),
    }
  }
}
