//! Implementation of the `lampbuild build` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use tracing::info;

use lampbuild_lib::builder::DockerBuilder;
use lampbuild_lib::pipeline::{BuildConfig, BuildReport, build_components, error_chain};

use super::ProjectArgs;
use crate::output::{
  ARROW, OutputFormat, print_info, print_json, print_stat, print_success, print_warning,
};

#[derive(Debug, Args)]
pub struct BuildArgs {
  #[command(flatten)]
  pub project: ProjectArgs,

  /// Docker executable used to pull, tag, and build
  #[arg(long, default_value = "docker")]
  pub docker: String,

  /// Tag base images without pulling them first
  #[arg(long)]
  pub no_pull: bool,

  /// Fail a step whose builder invocation runs longer than this (e.g. 30m)
  #[arg(long)]
  pub step_timeout: Option<humantime::Duration>,
}

/// Build the selected components.
///
/// When `lamp.json` declares `build_docker`, that command is run instead
/// with `HASH` set and the component names appended.
pub fn cmd_build(args: &BuildArgs, format: OutputFormat) -> Result<()> {
  let store = args.project.load()?;

  if let Some(command) = &store.manifest().build_command {
    return run_override(command, store.layout().root(), &args.project);
  }

  let mut config = BuildConfig::new(args.project.plan_config(), args.project.selection());
  config.pull_base = !args.no_pull;
  config.step_timeout = args.step_timeout.map(Into::into);
  let builder = DockerBuilder::new(&args.docker);

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(async {
    tokio::select! {
      result = build_components(&store, &builder, &config) => result.map_err(anyhow::Error::from),
      _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
    }
  })?;

  if format.is_json() {
    print_report_json(&report, &config.plan.hash, started.elapsed())?;
  } else {
    print_report(&report, started.elapsed());
  }

  match report.failed {
    Some((_, error)) => Err(error.into()),
    None => Ok(()),
  }
}

fn print_report(report: &BuildReport, elapsed: std::time::Duration) {
  if report.order.is_empty() {
    print_info("Nothing to build");
    return;
  }

  println!();
  for built in &report.built {
    print_success(&format!("{} {} {}", built.component, ARROW, built.tags.join(", ")));
  }
  for skipped in &report.skipped {
    print_warning(&format!("{skipped} skipped"));
  }

  println!();
  print_stat("Built", &format!("{}/{}", report.built.len(), report.order.len()));
  // Truncated to whole milliseconds.
  let elapsed = std::time::Duration::from_millis(elapsed.as_millis() as u64);
  print_stat("Elapsed", &humantime::format_duration(elapsed).to_string());
}

fn print_report_json(report: &BuildReport, hash: &str, elapsed: std::time::Duration) -> Result<()> {
  let failed = report.failed.as_ref().map(|(component, error)| {
    serde_json::json!({
      "component": component,
      "step": error.step(),
      "error": error_chain(error),
    })
  });
  print_json(&serde_json::json!({
    "hash": hash,
    "order": report.order,
    "built": report.built,
    "failed": failed,
    "skipped": report.skipped,
    "states": report.states,
    "elapsed_ms": elapsed.as_millis() as u64,
  }))
}

fn run_override(command: &[String], root: &Path, args: &ProjectArgs) -> Result<()> {
  let Some((program, rest)) = command.split_first() else {
    bail!("build_docker in lamp.json is empty");
  };

  info!(command = %command.join(" "), hash = %args.hash, "running project build command");
  let status = std::process::Command::new(program)
    .args(rest)
    .args(&args.components)
    .current_dir(root)
    .env("HASH", &args.hash)
    .status()
    .with_context(|| format!("Failed to run {program}"))?;

  if !status.success() {
    bail!("build command `{}` failed with {status}", command.join(" "));
  }
  Ok(())
}
