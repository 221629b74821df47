//! Narrowing of the shared build context.
//!
//! Every component lives under `components/`, which is also the context
//! directory handed to the image builder. Each build step temporarily rewrites
//! `components/.dockerignore` so only the files that step needs are sent, and
//! restores the original content when the step ends.

mod lock;
mod rules;
mod scope;

pub use lock::{ContextLock, ContextLockError, LockMetadata};
pub use rules::{IgnoreRule, IgnoreRules};
pub use scope::{ContextScope, ContextScopeError, SharedContext};
