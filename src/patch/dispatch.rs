//! Routing patch types to a source and destination document.
//!
//! Each dispatch context is a flat table from [`PatchType`] to an optional
//! [`Route`]. A `None` route means the type is a no-op in that context.

use crate::config::schema::{ComposedPatch, EnvironmentPatch, PatchSpec, PatchType};
use crate::patch::errors::PatchError;
use crate::patch::Patcher;
use crate::resource::Unstructured;
use std::fmt;

/// A document participating in a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    ObservedComposite,
    DesiredComposite,
    ObservedComposed,
    DesiredComposed,
    Environment,
}

/// How the value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Read one field path.
    Direct,
    /// Read every combine variable and merge them.
    Combine,
}

/// A directional data flow between two documents. Patches always read from
/// observed state (or the environment) and write to desired state (or the
/// environment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    ObservedCompositeToEnvironment,
    EnvironmentToDesiredComposite,
    ObservedComposedToDesiredComposite,
    ObservedComposedToEnvironment,
    ObservedCompositeToDesiredComposed,
    EnvironmentToDesiredComposed,
}

impl Flow {
    pub fn source(self) -> Role {
        match self {
            Flow::ObservedCompositeToEnvironment | Flow::ObservedCompositeToDesiredComposed => {
                Role::ObservedComposite
            }
            Flow::EnvironmentToDesiredComposite | Flow::EnvironmentToDesiredComposed => {
                Role::Environment
            }
            Flow::ObservedComposedToDesiredComposite | Flow::ObservedComposedToEnvironment => {
                Role::ObservedComposed
            }
        }
    }

    pub fn destination(self) -> Role {
        match self {
            Flow::ObservedCompositeToEnvironment | Flow::ObservedComposedToEnvironment => {
                Role::Environment
            }
            Flow::EnvironmentToDesiredComposite | Flow::ObservedComposedToDesiredComposite => {
                Role::DesiredComposite
            }
            Flow::ObservedCompositeToDesiredComposed | Flow::EnvironmentToDesiredComposed => {
                Role::DesiredComposed
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub flow: Flow,
    pub mode: Mode,
}

impl Route {
    const fn new(flow: Flow, mode: Mode) -> Self {
        Self { flow, mode }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} -> {:?} ({:?})",
            self.flow.source(),
            self.flow.destination(),
            self.mode
        )
    }
}

/// What happened to a patch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied(Route),
    /// The patch type has no route in this context.
    NotApplicable,
    /// The patch reads from a composed resource that has not been observed yet.
    NotObserved,
}

/// Routes for patches between the observed composite and the environment.
pub fn environment_route(patch_type: PatchType) -> Option<Route> {
    match patch_type {
        PatchType::FromCompositeFieldPath => Some(Route::new(
            Flow::ObservedCompositeToEnvironment,
            Mode::Direct,
        )),
        PatchType::CombineFromComposite => Some(Route::new(
            Flow::ObservedCompositeToEnvironment,
            Mode::Combine,
        )),
        PatchType::ToCompositeFieldPath => Some(Route::new(
            Flow::EnvironmentToDesiredComposite,
            Mode::Direct,
        )),
        PatchType::CombineToComposite => Some(Route::new(
            Flow::EnvironmentToDesiredComposite,
            Mode::Combine,
        )),
        PatchType::FromEnvironmentFieldPath
        | PatchType::CombineFromEnvironment
        | PatchType::ToEnvironmentFieldPath
        | PatchType::CombineToEnvironment
        | PatchType::PatchSet => None,
    }
}

/// Routes for patches to or from a composed resource.
pub fn composed_route(patch_type: PatchType) -> Option<Route> {
    match patch_type {
        PatchType::ToCompositeFieldPath => Some(Route::new(
            Flow::ObservedComposedToDesiredComposite,
            Mode::Direct,
        )),
        PatchType::CombineToComposite => Some(Route::new(
            Flow::ObservedComposedToDesiredComposite,
            Mode::Combine,
        )),
        PatchType::ToEnvironmentFieldPath => Some(Route::new(
            Flow::ObservedComposedToEnvironment,
            Mode::Direct,
        )),
        PatchType::CombineToEnvironment => Some(Route::new(
            Flow::ObservedComposedToEnvironment,
            Mode::Combine,
        )),
        PatchType::FromCompositeFieldPath => Some(Route::new(
            Flow::ObservedCompositeToDesiredComposed,
            Mode::Direct,
        )),
        PatchType::CombineFromComposite => Some(Route::new(
            Flow::ObservedCompositeToDesiredComposed,
            Mode::Combine,
        )),
        PatchType::FromEnvironmentFieldPath => Some(Route::new(
            Flow::EnvironmentToDesiredComposed,
            Mode::Direct,
        )),
        PatchType::CombineFromEnvironment => Some(Route::new(
            Flow::EnvironmentToDesiredComposed,
            Mode::Combine,
        )),
        // Patch sets are inlined before dispatch.
        PatchType::PatchSet => None,
    }
}

/// Returns true if the patch type writes to a composed resource rather than
/// reading from one.
pub fn to_composed_resource(patch_type: PatchType) -> bool {
    match patch_type {
        PatchType::FromCompositeFieldPath
        | PatchType::CombineFromComposite
        | PatchType::FromEnvironmentFieldPath
        | PatchType::CombineFromEnvironment => true,
        PatchType::ToCompositeFieldPath
        | PatchType::CombineToComposite
        | PatchType::ToEnvironmentFieldPath
        | PatchType::CombineToEnvironment
        | PatchType::PatchSet => false,
    }
}

impl Patcher<'_> {
    /// Applies a patch to or from the environment. Patches to the environment
    /// always read the observed composite; patches from the environment always
    /// write the desired composite.
    pub fn apply_environment_patch(
        &self,
        patch: &EnvironmentPatch,
        env: &mut Unstructured,
        oxr: &Unstructured,
        dxr: &mut Unstructured,
    ) -> Result<PatchOutcome, PatchError> {
        let Some(route) = environment_route(patch.spec.patch_type) else {
            return Ok(PatchOutcome::NotApplicable);
        };

        let (from, to): (&Unstructured, &mut Unstructured) = match route.flow {
            Flow::ObservedCompositeToEnvironment => (oxr, env),
            Flow::EnvironmentToDesiredComposite => (&*env, dxr),
            _ => return Ok(PatchOutcome::NotApplicable),
        };

        tracing::debug!(
            patch_type = %patch.spec.patch_type,
            route = %route,
            "applying environment patch"
        );
        self.apply_route(&patch.spec, route.mode, from, to)?;
        Ok(PatchOutcome::Applied(route))
    }

    /// Applies a patch to or from a composed resource.
    ///
    /// `ocd` is `None` when the composed resource has not been observed yet.
    /// Patches that read from it are skipped until it exists.
    pub fn apply_composed_patch(
        &self,
        patch: &ComposedPatch,
        ocd: Option<&Unstructured>,
        dcd: &mut Unstructured,
        oxr: &Unstructured,
        dxr: &mut Unstructured,
        env: &mut Unstructured,
    ) -> Result<PatchOutcome, PatchError> {
        let patch_type = patch.spec.patch_type;
        let Some(route) = composed_route(patch_type) else {
            return Ok(PatchOutcome::NotApplicable);
        };

        if ocd.is_none() && !to_composed_resource(patch_type) {
            tracing::trace!(patch_type = %patch_type, "composed resource not observed yet");
            return Ok(PatchOutcome::NotObserved);
        }

        // Sources are observed state, destinations desired state.
        let (from, to): (&Unstructured, &mut Unstructured) = match route.flow {
            Flow::ObservedComposedToDesiredComposite => match ocd {
                Some(ocd) => (ocd, dxr),
                None => return Ok(PatchOutcome::NotObserved),
            },
            Flow::ObservedComposedToEnvironment => match ocd {
                Some(ocd) => (ocd, env),
                None => return Ok(PatchOutcome::NotObserved),
            },
            Flow::ObservedCompositeToDesiredComposed => (oxr, dcd),
            Flow::EnvironmentToDesiredComposed => (&*env, dcd),
            Flow::ObservedCompositeToEnvironment | Flow::EnvironmentToDesiredComposite => {
                return Ok(PatchOutcome::NotApplicable)
            }
        };

        tracing::debug!(patch_type = %patch_type, route = %route, "applying composed patch");
        self.apply_route(&patch.spec, route.mode, from, to)?;
        Ok(PatchOutcome::Applied(route))
    }

    fn apply_route(
        &self,
        patch: &PatchSpec,
        mode: Mode,
        from: &Unstructured,
        to: &mut Unstructured,
    ) -> Result<(), PatchError> {
        match mode {
            Mode::Direct => self.apply_from_field_path_patch(patch, from, to),
            Mode::Combine => self.apply_combine_from_variables_patch(patch, from, to),
        }
    }
}
