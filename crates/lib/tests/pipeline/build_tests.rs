//! Build order, tagging, and failure behaviour of full runs.

use std::time::Duration;

use lampbuild_lib::config::ConfigError;
use lampbuild_lib::pipeline::{BuildPipeline, ComponentState, PipelineError, Selection, StepFailure, build_components};

use super::common::{Call, FakeBuilder, TestProject, config, explicit};

#[tokio::test]
async fn dependencies_are_built_first_even_when_not_requested() {
  let project = TestProject::new("shop");
  project.component("shared", "");
  project.component("web", "dependencies:\n  - shared\n");
  let store = project.store();
  let builder = FakeBuilder::new();

  let report = build_components(&store, &builder, &config("local", explicit(&["web"])))
    .await
    .unwrap();

  assert!(report.is_success());
  assert_eq!(report.order, vec!["shared", "web"]);
  let built: Vec<_> = report.built.iter().map(|b| b.component.as_str()).collect();
  assert_eq!(built, vec!["shared", "web"]);

  let shared_done = builder.position("shop-shared:editor").unwrap();
  let web_start = builder.position("shop-web:local").unwrap();
  assert!(shared_done < web_start);
}

#[tokio::test]
async fn dependency_content_is_copied_before_own_content() {
  let project = TestProject::new("shop");
  project.component("shared", "").packaged("shared");
  project.component("web", "dependencies: [shared]\n").packaged("web");
  let store = project.store();
  let builder = FakeBuilder::new();

  build_components(&store, &builder, &config("local", explicit(&["web"])))
    .await
    .unwrap();

  let web_steps: Vec<String> = builder
    .builds()
    .iter()
    .flat_map(Call::tags)
    .filter(|t| t.starts_with("shop-web-"))
    .collect();
  assert_eq!(
    web_steps,
    vec![
      "shop-web-add-poetry:local",
      "shop-web-aladdinize:local",
      "shop-web-add-shared-packages:local",
      "shop-web-add-shared-content:local",
      "shop-web-add-web-packages:local",
      "shop-web-add-web-content:local",
    ]
  );
}

#[tokio::test]
async fn cycle_fails_before_any_builder_call() {
  let project = TestProject::new("shop");
  project.component("a", "dependencies: [b]\n");
  project.component("b", "dependencies: [c]\n");
  project.component("c", "dependencies: [a]\n");
  let store = project.store();
  let builder = FakeBuilder::new();

  let err = build_components(&store, &builder, &config("local", explicit(&["a"])))
    .await
    .unwrap_err();

  match err {
    PipelineError::Config(ConfigError::Cycle { cycle }) => {
      for name in ["a", "b", "c"] {
        assert!(cycle.iter().any(|c| c == name), "{name} missing from {cycle:?}");
      }
    }
    other => panic!("expected a cycle error, got {other:?}"),
  }
  assert!(builder.calls().is_empty());
}

#[tokio::test]
async fn cycle_off_the_requested_path_still_fails() {
  let project = TestProject::new("shop");
  project.component("standalone", "");
  project.component("x", "dependencies: [y]\n");
  project.component("y", "dependencies: [x]\n");
  let store = project.store();
  let builder = FakeBuilder::new();

  let err = build_components(&store, &builder, &config("local", explicit(&["standalone"])))
    .await
    .unwrap_err();

  assert!(matches!(err, PipelineError::Config(ConfigError::Cycle { .. })));
  assert!(builder.calls().is_empty());
}

#[tokio::test]
async fn dev_build_produces_main_and_editor_tags() {
  let project = TestProject::new("shop");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  let report = build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert_eq!(report.built[0].tags, vec!["shop-web:local", "shop-web:editor"]);
  assert!(builder.position("shop-web:editor").is_some());
  assert!(builder.position("shop-web-aladdinize:local").is_some());
}

#[tokio::test]
async fn release_build_produces_only_hash_tag() {
  let project = TestProject::new("shop");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  let report = build_components(&store, &builder, &config("abc1234567", Selection::All))
    .await
    .unwrap();

  assert_eq!(report.built[0].tags, vec!["shop-web:abc1234567"]);
  assert!(builder.position(":editor").is_none());
  assert!(builder.position("shop-web-").is_none(), "no purpose tags in release builds");

  let optimized = builder.builds().iter().all(|c| match c {
    Call::Build { args, .. } => args.get("PYTHON_OPTIMIZE").is_none_or(|v| v == "-O"),
    _ => true,
  });
  assert!(optimized);
}

#[tokio::test]
async fn failure_aborts_later_components_and_keeps_earlier_ones() {
  let project = TestProject::new("shop");
  for name in ["a", "b", "c"] {
    project.component(name, "");
  }
  let store = project.store();
  let builder = FakeBuilder::failing_on("shop-b-aladdinize");

  let report = build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert!(!report.is_success());
  assert_eq!(report.built.len(), 1);
  assert_eq!(report.built[0].component, "a");
  assert_eq!(report.built[0].tags, vec!["shop-a:local", "shop-a:editor"]);
  assert_eq!(report.skipped, vec!["c"]);
  assert_eq!(report.state("a"), Some(&ComponentState::Succeeded));
  assert_eq!(report.state("b"), Some(&ComponentState::Failed));
  assert_eq!(report.state("c"), Some(&ComponentState::Pending));
  assert!(builder.position("shop-c").is_none());

  let (component, err) = report.failed.as_ref().unwrap();
  assert_eq!(component, "b");
  assert_eq!(err.component(), Some("b"));
  assert_eq!(err.step(), Some("aladdinize"));
}

#[tokio::test]
async fn resolution_error_fails_only_when_component_is_reached() {
  let project = TestProject::new("shop");
  project.component("api", "");
  project.component("worker", "image:\n  base: ubuntu:22.04\n");
  let store = project.store();
  let builder = FakeBuilder::new();

  let report = build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert_eq!(report.built.len(), 1);
  let (component, err) = report.failed.as_ref().unwrap();
  assert_eq!(component, "worker");
  assert!(matches!(
    err,
    PipelineError::Config(ConfigError::MissingField {
      field: "image.user.name",
      ..
    })
  ));
  assert!(builder.position("shop-worker").is_none());
}

#[tokio::test]
async fn step_timeout_fails_the_step() {
  let project = TestProject::new("shop");
  project.write("components/.dockerignore", "**/__pycache__\n");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::hanging_on("shop-web-aladdinize");

  let mut config = config("local", Selection::All);
  config.step_timeout = Some(Duration::from_millis(50));

  let report = build_components(&store, &builder, &config).await.unwrap();

  let (_, err) = report.failed.as_ref().unwrap();
  match err {
    PipelineError::Step(step) => {
      assert_eq!(step.step, "aladdinize");
      assert!(matches!(step.cause, StepFailure::TimedOut(_)));
    }
    other => panic!("expected a step error, got {other:?}"),
  }
  assert_eq!(project.ignore_file().as_deref(), Some("**/__pycache__\n"));
}

#[tokio::test]
async fn no_pull_only_tags_base() {
  let project = TestProject::new("shop");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  let mut config = config("local", Selection::All);
  config.pull_base = false;
  build_components(&store, &builder, &config).await.unwrap();

  let calls = builder.calls();
  assert!(!calls.iter().any(|c| matches!(c, Call::Pull(_))));
  assert_eq!(
    calls[0],
    Call::Tag("python:3.8-slim".to_string(), "shop-web:local".to_string())
  );
}

#[tokio::test]
async fn empty_selection_builds_nothing() {
  let project = TestProject::new("shop");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  let report = build_components(&store, &builder, &config("abc", Selection::Published))
    .await
    .unwrap();

  assert!(report.is_success());
  assert!(report.order.is_empty());
  assert!(builder.calls().is_empty());
}

#[tokio::test]
async fn auto_selection_depends_on_dev_mode() {
  let project = TestProject::new("shop");
  project.write("lamp.json", r#"{"name": "shop", "docker_images": ["shop-web"]}"#);
  project.component("web", "");
  project.component("tools", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  let dev = config("local", Selection::Auto);
  let release = config("abc", Selection::Auto);
  let dev_order = BuildPipeline::new(&store, &builder, &dev).unwrap().order().unwrap();
  let release_order = BuildPipeline::new(&store, &builder, &release).unwrap().order().unwrap();

  assert_eq!(dev_order, vec!["tools", "web"]);
  assert_eq!(release_order, vec!["web"]);
}

#[tokio::test]
async fn unknown_component_is_rejected_before_building() {
  let project = TestProject::new("shop");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  let err = build_components(&store, &builder, &config("local", explicit(&["web", "nope"])))
    .await
    .unwrap_err();

  assert!(matches!(err, PipelineError::Config(ConfigError::UnknownComponent(ref name)) if name == "nope"));
  assert!(builder.calls().is_empty());
}

#[tokio::test]
async fn component_without_declaration_builds_with_defaults() {
  let project = TestProject::new("shop");
  std::fs::create_dir_all(project.components_dir().join("legacy")).unwrap();
  let store = project.store();
  let builder = FakeBuilder::new();

  let report = build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert_eq!(report.built[0].component, "legacy");
  assert_eq!(builder.calls()[0], Call::Pull("python:3.8-slim".to_string()));
}

#[test]
fn plans_are_deterministic() {
  let project = TestProject::new("shop");
  project.component("shared", "").packaged("shared");
  project.component("web", "dependencies: [shared]\n");
  project.component("api", "dependencies: [shared]\n");
  let store = project.store();
  let builder = FakeBuilder::new();
  let config = config("local", Selection::All);

  let pipeline = BuildPipeline::new(&store, &builder, &config).unwrap();
  let first = pipeline.plans().unwrap();
  let second = pipeline.plans().unwrap();

  assert_eq!(first, second);
  let order: Vec<_> = first.iter().map(|p| p.component.as_str()).collect();
  assert_eq!(order, vec!["shared", "api", "web"]);
}
