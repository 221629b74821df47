//! The external image builder.
//!
//! The pipeline only ever talks to an [`ImageBuilder`]. [`DockerBuilder`]
//! shells out to the `docker` CLI; tests substitute a recording fake.

mod docker;
pub mod dockerfiles;
mod types;

pub use docker::DockerBuilder;
pub use types::{BuildRequest, BuilderError, DockerfileSource, ImageBuilder};
