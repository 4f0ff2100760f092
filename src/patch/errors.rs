use crate::combine::CombineError;
use crate::config::schema::PatchType;
use crate::fieldpath::FieldPathError;
use crate::transform::TransformError;
use thiserror::Error;

/// Errors raised while applying a single patch.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{field} is required by patch type {patch_type}")]
    RequiredField {
        field: &'static str,
        patch_type: PatchType,
    },

    #[error(transparent)]
    FieldPath(#[from] FieldPathError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error("cannot expand ToFieldPath {path}")]
    ExpandingArrayFieldPaths { path: String },

    #[error("cannot patch to object: {source}")]
    PatchToObject {
        #[source]
        source: FieldPathError,
    },

    #[error("cannot convert patched object: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl PatchError {
    /// Returns true when a source field path did not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PatchError::FieldPath(err) if err.is_not_found())
    }
}

/// Configuration errors raised while inlining patch sets. These invalidate
/// the whole composition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchSetError {
    #[error("a patch in a PatchSet cannot be of type PatchSet (PatchSet {patch_set}, patch {index})")]
    PatchSetType { patch_set: String, index: usize },

    #[error("{field} is required by patch type {patch_type} (resource {resource}, patch {index})")]
    RequiredField {
        field: &'static str,
        patch_type: PatchType,
        resource: String,
        index: usize,
    },

    #[error("cannot find PatchSet by name {name}{}", did_you_mean(.suggestion))]
    UndefinedPatchSet {
        name: String,
        suggestion: Option<String>,
    },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean {name}?)"),
        None => String::new(),
    }
}
