//! Step Dockerfiles compiled into the binary.
//!
//! Each is parameterised entirely by build arguments and sent on stdin, so the
//! build context stays the shared `components/` directory.

pub const BUILDER: &str = include_str!("../../dockerfiles/builder.dockerfile");
pub const ADD_PACKAGE_MANAGER: &str = include_str!("../../dockerfiles/add-poetry.dockerfile");
pub const ALADDINIZE: &str = include_str!("../../dockerfiles/aladdinize.dockerfile");
pub const ADD_COMPONENT_PACKAGES: &str = include_str!("../../dockerfiles/add-component-packages.dockerfile");
pub const ADD_COMPONENT_CONTENT: &str = include_str!("../../dockerfiles/add-component-content.dockerfile");
pub const ADD_LOCAL_BIN: &str = include_str!("../../dockerfiles/add-local-bin-to-path.dockerfile");
pub const EDITOR: &str = include_str!("../../dockerfiles/editor.dockerfile");
