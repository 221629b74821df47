//! Names and defaults shared across the crate.

pub const APP_NAME: &str = "lampbuild";

/// The project manifest file name, located at the project root.
pub const MANIFEST_FILENAME: &str = "lamp.json";

/// Directory under the project root holding one subdirectory per component.
pub const COMPONENTS_DIR: &str = "components";

/// Optional per-component declaration file.
pub const DECLARATION_FILENAME: &str = "component.yaml";

/// The shared ignore-list at the root of the build context.
pub const IGNORE_FILENAME: &str = ".dockerignore";

pub const IGNORE_BACKUP_FILENAME: &str = ".dockerignore.lampbuild-backup";

pub const LOCK_FILENAME: &str = ".lampbuild.lock";

/// Component-provided Dockerfile overlay.
pub const OVERLAY_DOCKERFILE: &str = "Dockerfile";

pub const PACKAGE_MANIFEST: &str = "pyproject.toml";
pub const PACKAGE_LOCKFILE: &str = "poetry.lock";

/// The hash value that selects a local development build.
pub const LOCAL_HASH: &str = "local";

pub const DEFAULT_LANGUAGE: &str = "python";
pub const DEFAULT_LANGUAGE_VERSION: &str = "3.8";
pub const DEFAULT_PACKAGE_MANAGER_VERSION: &str = "1.0.9";

pub const DEFAULT_USER_NAME: &str = "aladdin-user";
pub const DEFAULT_WORKDIR: &str = "/code";

/// Width of the log level column; builder output is indented by this much.
pub const OUTPUT_INDENT: usize = 9;
