//! Implementation of the `lampbuild plan` command.
//!
//! Loads and validates the project and resolves every selected component's
//! build plan without invoking the builder.

use anyhow::Result;

use lampbuild_lib::builder::DockerBuilder;
use lampbuild_lib::pipeline::{BuildConfig, BuildPipeline};

use super::ProjectArgs;
use crate::output::{ARROW, OutputFormat, print_info, print_json, print_stat, print_warning};

pub fn cmd_plan(args: &ProjectArgs, format: OutputFormat) -> Result<()> {
  let store = args.load()?;
  let config = BuildConfig::new(args.plan_config(), args.selection());
  let builder = DockerBuilder::default();

  let pipeline = BuildPipeline::new(&store, &builder, &config)?;
  let plans = pipeline.plans()?;
  let order: Vec<&str> = plans.iter().map(|p| p.component.as_str()).collect();

  if format.is_json() {
    return print_json(&serde_json::json!({
      "project": store.manifest().name,
      "hash": config.plan.hash,
      "order": order,
      "plans": plans,
    }));
  }

  if store.manifest().build_command.is_some() {
    print_warning("lamp.json sets build_docker; `lampbuild build` runs that command instead");
  }
  if plans.is_empty() {
    print_info("Nothing to build");
    return Ok(());
  }

  let separator = format!(" {} ", ARROW);
  print_info(&format!("Build order: {}", order.join(separator.as_str())));
  for plan in &plans {
    println!();
    println!("{}", plan.tag);
    print_stat("Base", &plan.base_image);
    print_stat("User", &plan.user.chown());
    if let Some(workdir) = &plan.workdir.path {
      print_stat("Workdir", workdir);
    }
    if !plan.transitive_dependencies.is_empty() {
      print_stat("Depends on", &plan.transitive_dependencies.join(", "));
    }
    for step in &plan.steps {
      println!("    {} {}", ARROW, step);
    }
  }

  Ok(())
}
