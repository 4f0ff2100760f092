//! Patch and Transform: declarative value flow between resource documents
//!
//! Patches copy, combine and transform values between a composite resource,
//! its composed resources and an environment document. The caller decides
//! which documents exist; this crate decides how values move between them.
//!
//! # Architecture
//!
//! Every patch compiles down to one primitive: read a value at a field path,
//! run it through a transform pipeline, and write it at one or more field
//! paths. Patch types only decide which pair of documents that primitive
//! connects.
//!
//! - [`fieldpath`]: parse, get, set and wildcard-expand field paths
//! - [`transform`]: the ordered transform pipeline
//! - [`combine`]: merging several values with a named strategy
//! - [`patch`]: patch-set inlining, routing and application
//! - [`render`]: rendering template bases onto composed resources
//! - [`config`]: the composition schema, loaders and the applicator
//!
//! # Example
//!
//! ```
//! use patch_and_transform::config::{PatchSpec, PatchType};
//! use patch_and_transform::{Patcher, Unstructured};
//! use serde_json::json;
//!
//! let oxr = Unstructured::from_value(json!({"spec": {"region": "us-east-1"}})).unwrap();
//! let mut dcd = Unstructured::new();
//! let patch = PatchSpec::new(PatchType::FromCompositeFieldPath)
//!     .from_field_path("spec.region")
//!     .to_field_path("spec.location");
//!
//! Patcher::default()
//!     .apply_from_field_path_patch(&patch, &oxr, &mut dcd)
//!     .unwrap();
//! assert_eq!(dcd.to_value(), json!({"spec": {"location": "us-east-1"}}));
//! ```

pub mod combine;
pub mod config;
pub mod fieldpath;
pub mod patch;
pub mod render;
pub mod resource;
pub mod transform;

// Re-exports
pub use combine::{CombineError, CombinerRegistry};
pub use config::{
    apply_patches, load_from_path, load_from_str, ApplicationError, Composition, ConfigError,
    Documents, PatchResult,
};
pub use fieldpath::{FieldPath, FieldPathError, Paved};
pub use patch::{composed_templates, PatchError, PatchOutcome, PatchSetError, Patcher};
pub use render::{render_from_json, RenderError};
pub use resource::{GroupVersionKind, Unstructured};
pub use transform::{resolve_transforms, TransformError};
