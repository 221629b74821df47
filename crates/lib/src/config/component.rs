//! Component declarations (`components/<name>/component.yaml`).

use serde_yaml::Value;

use super::document::ConfigDocument;
use super::error::ConfigError;
use super::setting::Setting;

/// Files found in a component's directory that affect its build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentLayout {
  /// A `component.yaml` was present.
  pub has_declaration: bool,
  /// A hand-authored `Dockerfile` overlay is present.
  pub has_overlay: bool,
  /// Both `pyproject.toml` and `poetry.lock` are present.
  pub is_package_managed: bool,
  /// A component-local `.dockerignore` is present.
  pub has_ignore_file: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDeclaration {
  pub create: Setting<bool>,
  pub name: Setting<String>,
  pub group: Setting<String>,
  pub home: Setting<String>,
  pub sudo: Setting<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkdirDeclaration {
  pub create: Setting<bool>,
  pub path: Setting<String>,
}

/// Everything a component declared about itself, before any defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentDeclaration {
  pub name: String,
  pub language_name: Setting<String>,
  pub language_version: Setting<String>,
  pub base_image: Setting<String>,
  pub aladdinize: Setting<bool>,
  pub package_manager: Setting<bool>,
  pub user: UserDeclaration,
  pub workdir: WorkdirDeclaration,
  /// System packages installed only in this component's builder image.
  pub packages: Vec<String>,
  /// Direct dependencies in declaration order, without duplicates.
  pub dependencies: Vec<String>,
  pub layout: ComponentLayout,
}

impl ComponentDeclaration {
  /// A component with nothing declared.
  pub fn empty(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_layout(mut self, layout: ComponentLayout) -> Self {
    self.layout = layout;
    self
  }

  /// Parse a `component.yaml` body for `name`.
  pub fn from_yaml_str(name: &str, source: &str) -> Result<Self, ConfigError> {
    let document = ConfigDocument::from_yaml_str(source).map_err(|message| ConfigError::InvalidDeclaration {
      component: name.to_string(),
      message,
    })?;
    Self::from_document(name, &document)
  }

  pub fn from_document(name: &str, doc: &ConfigDocument) -> Result<Self, ConfigError> {
    let fields = Fields { component: name, doc };

    let language_name = fields.string("language.name")?.map(|n| n.to_lowercase());

    Ok(Self {
      name: name.to_string(),
      language_name,
      language_version: fields.version("language.version")?,
      base_image: fields.string("image.base")?,
      aladdinize: fields.boolean("image.aladdinize")?,
      package_manager: fields.boolean("image.add_poetry")?,
      user: UserDeclaration {
        create: fields.boolean("image.user.create")?,
        name: fields.string("image.user.name")?,
        group: fields.string("image.user.group")?,
        home: fields.string("image.user.home")?,
        sudo: fields.boolean("image.user.sudo")?,
      },
      workdir: WorkdirDeclaration {
        create: fields.boolean("image.workdir.create")?,
        path: fields.string("image.workdir.path")?,
      },
      packages: fields.string_list("image.packages")?,
      dependencies: dedup(fields.string_list("dependencies")?),
      layout: ComponentLayout {
        has_declaration: true,
        ..Default::default()
      },
    })
  }
}

/// Typed field extraction that names the component and field on mismatch.
struct Fields<'a> {
  component: &'a str,
  doc: &'a ConfigDocument,
}

impl Fields<'_> {
  fn invalid(&self, field: &'static str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidField {
      component: self.component.to_string(),
      field,
      expected,
    }
  }

  fn string(&self, field: &'static str) -> Result<Setting<String>, ConfigError> {
    match self.doc.get(field) {
      Setting::Unset => Ok(Setting::Unset),
      Setting::Set(Value::String(s)) => Ok(Setting::Set(s.clone())),
      Setting::Set(_) => Err(self.invalid(field, "a string")),
    }
  }

  /// Versions may be written as bare YAML numbers (`3.8`).
  fn version(&self, field: &'static str) -> Result<Setting<String>, ConfigError> {
    match self.doc.get(field) {
      Setting::Unset => Ok(Setting::Unset),
      Setting::Set(Value::String(s)) => Ok(Setting::Set(s.clone())),
      Setting::Set(Value::Number(n)) => Ok(Setting::Set(n.to_string())),
      Setting::Set(_) => Err(self.invalid(field, "a version string")),
    }
  }

  fn boolean(&self, field: &'static str) -> Result<Setting<bool>, ConfigError> {
    match self.doc.get(field) {
      Setting::Unset => Ok(Setting::Unset),
      Setting::Set(Value::Bool(b)) => Ok(Setting::Set(*b)),
      Setting::Set(_) => Err(self.invalid(field, "true or false")),
    }
  }

  fn string_list(&self, field: &'static str) -> Result<Vec<String>, ConfigError> {
    match self.doc.get(field) {
      Setting::Unset => Ok(Vec::new()),
      Setting::Set(Value::Sequence(items)) => items
        .iter()
        .map(|item| match item {
          Value::String(s) => Ok(s.clone()),
          _ => Err(self.invalid(field, "a list of strings")),
        })
        .collect(),
      Setting::Set(_) => Err(self.invalid(field, "a list of strings")),
    }
  }
}

fn dedup(items: Vec<String>) -> Vec<String> {
  let mut seen = std::collections::HashSet::new();
  items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
