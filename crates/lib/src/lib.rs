//! lampbuild-lib: Component image build orchestration
//!
//! This crate turns a multi-component project into an ordered series of
//! container image builds:
//! - `config`: the project manifest and per-component declarations
//! - `graph`: the component dependency graph and build order
//! - `plan`: resolving a declaration into a concrete `BuildPlan`
//! - `context`: scoped narrowing of the shared build context
//! - `builder`: the external image builder seam
//! - `pipeline`: the sequential build loop

pub mod builder;
pub mod config;
pub mod consts;
pub mod context;
pub mod graph;
pub mod pipeline;
pub mod plan;
