//! The shared ignore-list across full runs.

use lampbuild_lib::context::ContextLock;
use lampbuild_lib::pipeline::{PipelineError, Selection, build_components};

use super::common::{Call, FakeBuilder, TestProject, config};

const ORIGINAL: &str = "# shared defaults\n**/__pycache__\n*.pyc";

#[tokio::test]
async fn ignore_list_is_restored_after_success() {
  let project = TestProject::new("shop");
  project.write("components/.dockerignore", ORIGINAL);
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert_eq!(project.ignore_file().as_deref(), Some(ORIGINAL));
  assert!(!project.components_dir().join(".dockerignore.lampbuild-backup").exists());
}

#[tokio::test]
async fn ignore_list_is_restored_after_failure() {
  let project = TestProject::new("shop");
  project.write("components/.dockerignore", ORIGINAL);
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::failing_on("shop-web-add-web-content");

  let report = build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert!(!report.is_success());
  assert_eq!(project.ignore_file().as_deref(), Some(ORIGINAL));
}

#[tokio::test]
async fn missing_ignore_list_stays_missing() {
  let project = TestProject::new("shop");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert_eq!(project.ignore_file(), None);
}

#[tokio::test]
async fn builder_sees_narrowed_context() {
  let project = TestProject::new("shop");
  project.write("components/.dockerignore", ORIGINAL);
  project.write("components/web/.dockerignore", "tests/\n");
  project.component("web", "");
  project.component("api", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  build_components(&store, &builder, &config("local", Selection::Explicit(vec!["web".into()])))
    .await
    .unwrap();

  let content_ignore = builder
    .builds()
    .into_iter()
    .find_map(|call| match call {
      Call::Build { tags, ignore, .. } if tags.iter().any(|t| t == "shop-web-add-web-content:local") => ignore,
      _ => None,
    })
    .unwrap();

  assert_eq!(
    content_ignore,
    format!("### Ephemeral modifications ###\n**\n!web\n{ORIGINAL}\nweb/tests/\n")
  );

  let aladdinize_ignore = builder
    .builds()
    .into_iter()
    .find_map(|call| match call {
      Call::Build { tags, ignore, .. } if tags.iter().any(|t| t.ends_with("-aladdinize:local")) => ignore,
      _ => None,
    })
    .unwrap();
  assert_eq!(aladdinize_ignore, "### Ephemeral modifications ###\n**\n");
}

#[tokio::test]
async fn interrupted_run_is_recovered_on_next_build() {
  let project = TestProject::new("shop");
  project.write("components/.dockerignore", "### Ephemeral modifications ###\n**\n");
  project.write(
    "components/.dockerignore.lampbuild-backup",
    &serde_json::json!({ "original": ORIGINAL }).to_string(),
  );
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap();

  assert_eq!(project.ignore_file().as_deref(), Some(ORIGINAL));
}

#[cfg(unix)]
#[tokio::test]
async fn concurrent_build_is_refused() {
  let project = TestProject::new("shop");
  project.component("web", "");
  let store = project.store();
  let builder = FakeBuilder::new();

  let _held = ContextLock::acquire(&project.components_dir(), "lampbuild build web").unwrap();
  let err = build_components(&store, &builder, &config("local", Selection::All))
    .await
    .unwrap_err();

  assert!(matches!(err, PipelineError::Lock(_)));
  assert!(builder.calls().is_empty());
}
