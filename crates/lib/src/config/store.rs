//! Loading every declaration of a project at once.

use tracing::debug;

use super::component::ComponentDeclaration;
use super::error::ConfigError;
use super::layout::ProjectLayout;
use super::manifest::ProjectManifest;

/// The manifest plus one declaration per component physically present.
///
/// Read once at the start of a build invocation and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ConfigStore {
  layout: ProjectLayout,
  manifest: ProjectManifest,
  components: Vec<ComponentDeclaration>,
}

impl ConfigStore {
  /// Load the manifest and every component declaration under `layout`.
  ///
  /// A component without a `component.yaml` gets an empty declaration.
  pub fn load(layout: ProjectLayout) -> Result<Self, ConfigError> {
    let manifest = ProjectManifest::load(&layout.manifest_path())?;

    let mut components = Vec::new();
    for name in layout.list_components()? {
      let component_layout = layout.component_layout(&name);
      let declaration = if component_layout.has_declaration {
        let path = layout.declaration_path(&name);
        let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
        ComponentDeclaration::from_yaml_str(&name, &source)?
      } else {
        ComponentDeclaration::empty(&name)
      };
      debug!(component = %name, declared = component_layout.has_declaration, "loaded component");
      components.push(declaration.with_layout(component_layout));
    }

    Ok(Self::from_parts(layout, manifest, components))
  }

  /// Assemble a store from already loaded parts. Components are kept in name order.
  pub fn from_parts(layout: ProjectLayout, manifest: ProjectManifest, mut components: Vec<ComponentDeclaration>) -> Self {
    components.sort_by(|a, b| a.name.cmp(&b.name));
    Self {
      layout,
      manifest,
      components,
    }
  }

  pub fn layout(&self) -> &ProjectLayout {
    &self.layout
  }

  pub fn manifest(&self) -> &ProjectManifest {
    &self.manifest
  }

  pub fn components(&self) -> &[ComponentDeclaration] {
    &self.components
  }

  pub fn component(&self, name: &str) -> Option<&ComponentDeclaration> {
    self.components.iter().find(|c| c.name == name)
  }

  pub fn names(&self) -> Vec<String> {
    self.components.iter().map(|c| c.name.clone()).collect()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.component(name).is_some()
  }
}
