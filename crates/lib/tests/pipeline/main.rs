//! End-to-end pipeline tests against a recording builder.

mod build_tests;
mod common;
mod context_tests;
