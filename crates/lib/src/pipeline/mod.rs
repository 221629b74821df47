//! Driving a full multi-component build.
//!
//! The pipeline validates the dependency graph over every component before
//! touching the builder, then builds the requested components and their
//! dependencies strictly in order. The first failure aborts the run; images
//! already built are left in place.

mod steps;
mod types;

use std::collections::BTreeSet;

use tracing::{debug, error, info, warn};

use crate::builder::ImageBuilder;
use crate::config::{ConfigError, ConfigStore};
use crate::context::{ContextLock, SharedContext};
use crate::graph::DependencyGraph;
use crate::plan::{BuildPlan, BuildStep, PlanResolver};

pub use steps::{StepAction, step_action};
pub use types::{
  BuildConfig, BuildReport, BuildStepError, BuiltComponent, ComponentState, PipelineError, Selection, StepFailure,
  error_chain,
};

/// A validated project ready to build.
pub struct BuildPipeline<'a, B> {
  store: &'a ConfigStore,
  graph: DependencyGraph,
  builder: &'a B,
  config: &'a BuildConfig,
}

impl<'a, B: ImageBuilder> BuildPipeline<'a, B> {
  /// Build and validate the dependency graph over every component in `store`.
  pub fn new(store: &'a ConfigStore, builder: &'a B, config: &'a BuildConfig) -> Result<Self, ConfigError> {
    let graph = DependencyGraph::build(store.components())?;
    graph.validate()?;
    Ok(Self {
      store,
      graph,
      builder,
      config,
    })
  }

  pub fn graph(&self) -> &DependencyGraph {
    &self.graph
  }

  /// Components requested by the configured [`Selection`].
  pub fn selected(&self) -> Result<Vec<String>, ConfigError> {
    let selection = match &self.config.selection {
      Selection::Auto if self.config.plan.is_dev() => &Selection::All,
      Selection::Auto => &Selection::Published,
      other => other,
    };

    let names = match selection {
      Selection::All | Selection::Auto => self.store.names(),
      Selection::Published => self.store.manifest().published_components(),
      Selection::Explicit(names) => names.clone(),
    };

    let mut seen = BTreeSet::new();
    let mut selected = Vec::new();
    for name in names {
      if !self.store.contains(&name) {
        return Err(ConfigError::UnknownComponent(name));
      }
      if seen.insert(name.clone()) {
        selected.push(name);
      }
    }
    Ok(selected)
  }

  /// Selected components plus everything they depend on, dependencies first.
  pub fn order(&self) -> Result<Vec<String>, ConfigError> {
    self.graph.build_order(&self.selected()?)
  }

  /// Resolve the plan of every component in build order without building.
  pub fn plans(&self) -> Result<Vec<BuildPlan>, ConfigError> {
    let resolver = PlanResolver::new(self.store, &self.graph, &self.config.plan);
    self
      .order()?
      .iter()
      .map(|component| resolver.resolve(component))
      .collect()
  }

  /// Build every selected component in order.
  ///
  /// Selection errors are returned before anything is built. A failure while
  /// building is recorded in the report and stops the run.
  pub async fn run(&self, context: &SharedContext) -> Result<BuildReport, PipelineError> {
    let order = self.order()?;
    let mut report = BuildReport::new(order.clone());

    if order.is_empty() {
      info!("nothing to build");
      return Ok(report);
    }
    info!(order = %order.join(", "), hash = %self.config.plan.hash, "building components");

    let resolver = PlanResolver::new(self.store, &self.graph, &self.config.plan);
    for (index, component) in order.iter().enumerate() {
      info!(component = %component, "building image");
      match self.build_component(&resolver, component, context, &mut report).await {
        Ok(tags) => {
          info!(component = %component, tags = %tags.join(", "), "built image");
          report.succeed(component, tags);
        }
        Err(e) => {
          error!(component = %component, error = %error_chain(&e), "failed to build image");
          let remaining = &order[index + 1..];
          if !remaining.is_empty() {
            warn!(skipped = %remaining.join(", "), "aborting remaining components");
          }
          report.fail(component, e);
          report.skip(remaining);
          break;
        }
      }
    }

    Ok(report)
  }

  async fn build_component(
    &self,
    resolver: &PlanResolver<'_>,
    component: &str,
    context: &SharedContext,
    report: &mut BuildReport,
  ) -> Result<Vec<String>, PipelineError> {
    report.transition(component, ComponentState::Resolving);
    let plan = resolver.resolve(component)?;

    for (index, step) in plan.steps.iter().enumerate() {
      report.transition(
        component,
        ComponentState::Building {
          step: index,
          label: step.purpose(),
        },
      );
      self
        .run_step(&plan, step, context)
        .await
        .map_err(|cause| BuildStepError {
          component: component.to_string(),
          step: step.purpose(),
          cause,
        })?;
    }

    Ok(plan.output_tags())
  }

  async fn run_step(&self, plan: &BuildPlan, step: &BuildStep, context: &SharedContext) -> Result<(), StepFailure> {
    debug!(component = %plan.component, step = %step, "running step");
    let action = step_action(plan, step, self.store.layout(), self.config.pull_base)?;
    let work = self.execute(action, context);

    match self.config.step_timeout {
      Some(limit) => tokio::time::timeout(limit, work)
        .await
        .map_err(|_| StepFailure::TimedOut(limit))?,
      None => work.await,
    }
  }

  async fn execute(&self, action: StepAction, context: &SharedContext) -> Result<(), StepFailure> {
    match action {
      StepAction::Tag { image, tag, pull } => {
        if pull {
          self.builder.pull(&image).await?;
        }
        self.builder.tag(&image, &tag).await?;
        Ok(())
      }
      StepAction::Build { rules, request } => {
        context
          .with_narrowed_context(&rules, || async {
            self.builder.build(&request).await.map_err(StepFailure::from)
          })
          .await
      }
    }
  }
}

/// Validate the project, lock the build context, and run.
///
/// The lock on `components/` is held for the whole run so that concurrent
/// invocations cannot interleave ignore-list rewrites.
pub async fn build_components<B: ImageBuilder>(
  store: &ConfigStore,
  builder: &B,
  config: &BuildConfig,
) -> Result<BuildReport, PipelineError> {
  let pipeline = BuildPipeline::new(store, builder, config)?;
  // Selection errors surface before the lock is taken.
  pipeline.order()?;

  let components_dir = store.layout().components_dir();
  let command = std::env::args().collect::<Vec<_>>().join(" ");
  let _lock = ContextLock::acquire(&components_dir, &command)?;
  let context = SharedContext::open(&components_dir)?;

  pipeline.run(&context).await
}
