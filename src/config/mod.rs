pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_patches, apply_patches_with, ApplicationError, Documents, PatchResult};
pub use loader::{load_document, load_from_path, load_from_str, ConfigError, Format};
pub use schema::{
    Combine, ComposedPatch, ComposedTemplate, Composition, EnvironmentConfig, EnvironmentPatch,
    FromFieldPathPolicy, PatchPolicy, PatchSet, PatchSpec, PatchType, Transform, ValidationError,
    ValidationIssue,
};
