//! Inlining named patch sets into composed-resource templates.

use crate::config::schema::{ComposedPatch, ComposedTemplate, PatchSet, PatchType};
use crate::patch::errors::PatchSetError;
use std::collections::BTreeMap;

const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Returns copies of `templates` with every `PatchSet` reference replaced by
/// the referenced set's patches, in place and in the set's declared order.
///
/// Sets may not nest: a `PatchSet`-typed member of any set fails the whole
/// call, whether or not a template references that set.
pub fn composed_templates(
    patch_sets: &[PatchSet],
    templates: &[ComposedTemplate],
) -> Result<Vec<ComposedTemplate>, PatchSetError> {
    let mut by_name: BTreeMap<&str, Vec<ComposedPatch>> = BTreeMap::new();
    for set in patch_sets {
        if let Some(index) = set
            .patches
            .iter()
            .position(|patch| patch.patch_type == PatchType::PatchSet)
        {
            return Err(PatchSetError::PatchSetType {
                patch_set: set.name.clone(),
                index,
            });
        }
        by_name.insert(set.name.as_str(), set.composed_patches());
    }

    templates
        .iter()
        .map(|template| inline_template(template, &by_name))
        .collect()
}

fn inline_template(
    template: &ComposedTemplate,
    by_name: &BTreeMap<&str, Vec<ComposedPatch>>,
) -> Result<ComposedTemplate, PatchSetError> {
    let mut patches = Vec::with_capacity(template.patches.len());

    for (index, patch) in template.patches.iter().enumerate() {
        if patch.spec.patch_type != PatchType::PatchSet {
            patches.push(patch.clone());
            continue;
        }

        let name = patch
            .patch_set_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PatchSetError::RequiredField {
                field: "patchSetName",
                patch_type: PatchType::PatchSet,
                resource: template.name.clone(),
                index,
            })?;

        let set = by_name
            .get(name)
            .ok_or_else(|| PatchSetError::UndefinedPatchSet {
                name: name.to_string(),
                suggestion: closest_name(name, by_name.keys().copied()),
            })?;

        tracing::trace!(
            resource = %template.name,
            patch_set = name,
            count = set.len(),
            "inlined patch set"
        );
        patches.extend(set.iter().cloned());
    }

    Ok(ComposedTemplate {
        name: template.name.clone(),
        base: template.base.clone(),
        patches,
    })
}

fn closest_name<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates
        .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}
