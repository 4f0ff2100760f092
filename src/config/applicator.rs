//! Patch applicator - runs a whole composition against a set of documents
//!
//! This module drives the engine the way an orchestrator would:
//! - Inlines patch sets into every resource template
//! - Applies environment patches, then each template's patches in order
//! - Renders template bases onto the desired composed resources
//! - Reports one result per patch, honouring each patch's policy

use crate::config::schema::{Composition, PatchSpec};
use crate::patch::{composed_templates, PatchError, PatchOutcome, PatchSetError, Patcher, Route};
use crate::render::{render_from_json, RenderError};
use crate::resource::Unstructured;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// The documents one invocation reads and writes.
///
/// Composed resources are keyed by template name. An observed composed
/// resource that is absent from `observed_resources` has not been created yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    pub observed_composite: Unstructured,
    pub desired_composite: Unstructured,
    pub observed_resources: BTreeMap<String, Unstructured>,
    pub desired_resources: BTreeMap<String, Unstructured>,
    pub environment: Unstructured,
}

/// Result of applying a single patch
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for success/failure"]
pub enum PatchResult {
    /// Patch wrote its value
    Applied { route: Route },
    /// Patch type does nothing in this context
    NotApplicable,
    /// Patch reads from a composed resource that has not been observed yet
    SkippedNotObserved { resource: String },
    /// Optional source field was not found
    SkippedOptional { reason: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { route } => write!(f, "Applied ({route})"),
            PatchResult::NotApplicable => write!(f, "Not applicable"),
            PatchResult::SkippedNotObserved { resource } => {
                write!(f, "Skipped (not observed): {resource}")
            }
            PatchResult::SkippedOptional { reason } => write!(f, "Skipped (optional): {reason}"),
        }
    }
}

impl PatchResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchResult::Applied { .. })
    }
}

/// Errors during patch application
#[derive(Error, Debug)]
pub enum ApplicationError {
    /// Patch sets could not be inlined; nothing was applied.
    #[error("cannot resolve patch sets: {0}")]
    PatchSet(#[from] PatchSetError),

    #[error("cannot render base of resource {resource}: {source}")]
    Render {
        resource: String,
        #[source]
        source: RenderError,
    },

    #[error("patch {id} failed: {source}")]
    Patch {
        id: String,
        #[source]
        source: PatchError,
    },
}

/// Apply a composition to `docs` with the built-in combine strategies.
///
/// Returns one `(id, result)` pair per patch in application order. Patch
/// failures are recorded and application continues; only patch set errors
/// abort the whole run.
pub fn apply_patches(
    composition: &Composition,
    docs: &mut Documents,
) -> Result<Vec<(String, Result<PatchResult, ApplicationError>)>, ApplicationError> {
    apply_patches_with(&Patcher::default(), composition, docs)
}

/// Like [`apply_patches`], with a caller-supplied patcher.
pub fn apply_patches_with(
    patcher: &Patcher<'_>,
    composition: &Composition,
    docs: &mut Documents,
) -> Result<Vec<(String, Result<PatchResult, ApplicationError>)>, ApplicationError> {
    let templates = composed_templates(&composition.patch_sets, &composition.resources)?;

    let mut results = Vec::new();

    for (idx, patch) in composition.environment_patches().iter().enumerate() {
        let id = format!("environment.patches[{idx}]");
        let outcome = patcher.apply_environment_patch(
            patch,
            &mut docs.environment,
            &docs.observed_composite,
            &mut docs.desired_composite,
        );
        results.push(record(id, &patch.spec, outcome, "environment"));
    }

    for template in &templates {
        let mut desired = docs
            .desired_resources
            .get(&template.name)
            .cloned()
            .unwrap_or_default();

        if let Some(base) = &template.base {
            if let Err(source) = render_from_json(&mut desired, base.to_string().as_bytes()) {
                tracing::warn!(
                    resource = %template.name,
                    error = %source,
                    "cannot render resource base"
                );
                results.push((
                    format!("resources[{}]", template.name),
                    Err(ApplicationError::Render {
                        resource: template.name.clone(),
                        source,
                    }),
                ));
                continue;
            }
        }

        let observed = docs.observed_resources.get(&template.name);
        for (idx, patch) in template.patches.iter().enumerate() {
            let outcome = patcher.apply_composed_patch(
                patch,
                observed,
                &mut desired,
                &docs.observed_composite,
                &mut docs.desired_composite,
                &mut docs.environment,
            );
            results.push(record(
                template.patch_id(idx),
                &patch.spec,
                outcome,
                &template.name,
            ));
        }

        docs.desired_resources.insert(template.name.clone(), desired);
    }

    Ok(results)
}

fn record(
    id: String,
    spec: &PatchSpec,
    outcome: Result<PatchOutcome, PatchError>,
    resource: &str,
) -> (String, Result<PatchResult, ApplicationError>) {
    let result = match outcome {
        Ok(PatchOutcome::Applied(route)) => Ok(PatchResult::Applied { route }),
        Ok(PatchOutcome::NotApplicable) => Ok(PatchResult::NotApplicable),
        Ok(PatchOutcome::NotObserved) => Ok(PatchResult::SkippedNotObserved {
            resource: resource.to_string(),
        }),
        Err(err) if err.is_not_found() && !spec.from_field_path_required() => {
            tracing::trace!(patch = %id, reason = %err, "optional source field not found");
            Ok(PatchResult::SkippedOptional {
                reason: err.to_string(),
            })
        }
        Err(source) => {
            tracing::warn!(patch = %id, error = %source, "patch failed");
            Err(ApplicationError::Patch {
                id: id.clone(),
                source,
            })
        }
    };
    (id, result)
}
