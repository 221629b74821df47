//! Project and component configuration.
//!
//! This module reads the project manifest (`lamp.json`) and each component's
//! optional `component.yaml` into typed values. Every optional field is a
//! [`Setting`], so "not declared" stays distinguishable from `false` or `""`
//! all the way into plan resolution.
//!
//! Loading is pure parsing: defaults and policy live in [`crate::plan`].

mod component;
mod document;
mod error;
mod layout;
mod manifest;
mod setting;
mod store;

pub use component::{ComponentDeclaration, ComponentLayout, UserDeclaration, WorkdirDeclaration};
pub use document::ConfigDocument;
pub use error::ConfigError;
pub use layout::ProjectLayout;
pub use manifest::ProjectManifest;
pub use setting::Setting;
pub use store::ConfigStore;
