//! Patch resolution and application.
//!
//! Patches move values between five documents: the observed and desired
//! composite resource, the observed and desired composed resource, and the
//! environment. [`dispatch`] decides which pair a patch type connects,
//! [`apply`] extracts, combines, transforms and writes the value, and
//! [`patchset`] inlines named patch sets before any of that happens.

pub mod apply;
pub mod dispatch;
pub mod errors;
pub mod patchset;

pub use dispatch::{
    composed_route, environment_route, to_composed_resource, Flow, Mode, PatchOutcome, Role,
    Route,
};
pub use errors::{PatchError, PatchSetError};
pub use patchset::composed_templates;

use crate::combine::CombinerRegistry;

/// Applies patches using a set of combine strategies.
#[derive(Debug, Clone, Copy)]
pub struct Patcher<'r> {
    combiners: &'r CombinerRegistry,
}

impl<'r> Patcher<'r> {
    pub fn new(combiners: &'r CombinerRegistry) -> Self {
        Self { combiners }
    }

    pub fn combiners(&self) -> &'r CombinerRegistry {
        self.combiners
    }
}

impl Default for Patcher<'static> {
    fn default() -> Self {
        Self::new(CombinerRegistry::builtin())
    }
}
