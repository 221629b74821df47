//! Build plan resolution.
//!
//! A [`BuildPlan`] is the fully resolved recipe for one component's image:
//! every tri-state declaration has been collapsed into a concrete value and
//! the ordered list of build steps is fixed. Plans are derived fresh for each
//! invocation and never cached.

mod resolve;
mod types;

pub use resolve::{PlanResolver, major_minor};
pub use types::{BuildPlan, BuildStep, PlanConfig, UserInfo, Workdir};
