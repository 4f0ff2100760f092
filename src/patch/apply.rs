//! Extracting source values and injecting results into destinations.

use crate::config::schema::PatchSpec;
use crate::fieldpath::Paved;
use crate::patch::errors::PatchError;
use crate::patch::Patcher;
use crate::resource::Unstructured;
use crate::transform::resolve_transforms;
use serde_json::Value;

const WILDCARD: &str = "[*]";

impl Patcher<'_> {
    /// Patches `to` with the value at `fromFieldPath` on `from`, after running
    /// it through the patch's transforms. `toFieldPath` defaults to
    /// `fromFieldPath`.
    pub fn apply_from_field_path_patch(
        &self,
        patch: &PatchSpec,
        from: &Unstructured,
        to: &mut Unstructured,
    ) -> Result<(), PatchError> {
        let from_path =
            patch
                .from_field_path
                .as_deref()
                .ok_or(PatchError::RequiredField {
                    field: "fromFieldPath",
                    patch_type: patch.patch_type,
                })?;
        let to_path = patch.to_field_path.as_deref().unwrap_or(from_path);

        let paved = Paved::new(from.to_value());
        let input = paved.get_value(from_path)?.clone();

        let out = resolve_transforms(&patch.transforms, input)?;

        patch_field_value(to_path, out, to)
    }

    /// Patches `to` with the combination of every variable read from `from`.
    ///
    /// If any variable does not resolve the patch is abandoned with that
    /// error before the strategy runs; strategies always see one value per
    /// declared variable.
    pub fn apply_combine_from_variables_patch(
        &self,
        patch: &PatchSpec,
        from: &Unstructured,
        to: &mut Unstructured,
    ) -> Result<(), PatchError> {
        let combine = patch.combine.as_ref().ok_or(PatchError::RequiredField {
            field: "combine",
            patch_type: patch.patch_type,
        })?;
        let to_path = patch
            .to_field_path
            .as_deref()
            .ok_or(PatchError::RequiredField {
                field: "toFieldPath",
                patch_type: patch.patch_type,
            })?;

        let paved = Paved::new(from.to_value());
        let values = combine
            .variables
            .iter()
            .map(|variable| paved.get_value(&variable.from_field_path).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let combined = self.combiners().combine(combine, &values)?;

        let out = resolve_transforms(&patch.transforms, combined)?;

        patch_field_value(to_path, out, to)
    }
}

/// Writes `value` at `field_path` on `to`, fanning out over every match when
/// the path contains `[*]`.
pub fn patch_field_value(
    field_path: &str,
    value: Value,
    to: &mut Unstructured,
) -> Result<(), PatchError> {
    if field_path.contains(WILDCARD) {
        patch_field_value_to_multiple(field_path, value, to)
    } else {
        patch_field_value_to_object(field_path, value, to)
    }
}

/// Sets a single path on `to`.
pub fn patch_field_value_to_object(
    field_path: &str,
    value: Value,
    to: &mut Unstructured,
) -> Result<(), PatchError> {
    let mut paved = Paved::new(to.to_value());
    paved
        .set_value(field_path, value)
        .map_err(|source| PatchError::PatchToObject { source })?;
    *to = Unstructured::from_value(paved.into_inner()).map_err(PatchError::Serialization)?;
    Ok(())
}

/// Expands the wildcards in `field_path` against `to` and sets every
/// resulting path. Zero matches is an error.
pub fn patch_field_value_to_multiple(
    field_path: &str,
    value: Value,
    to: &mut Unstructured,
) -> Result<(), PatchError> {
    let mut paved = Paved::new(to.to_value());

    let paths = paved
        .expand_wildcards(field_path)
        .map_err(|source| PatchError::PatchToObject { source })?;

    if paths.is_empty() {
        return Err(PatchError::ExpandingArrayFieldPaths {
            path: field_path.to_string(),
        });
    }

    tracing::trace!(path = field_path, matches = paths.len(), "expanded wildcard path");

    for path in &paths {
        paved
            .set_value_at(path, value.clone())
            .map_err(|source| PatchError::PatchToObject { source })?;
    }

    *to = Unstructured::from_value(paved.into_inner()).map_err(PatchError::Serialization)?;
    Ok(())
}
