//! Field-path addressing over JSON-like documents.
//!
//! Paths use dotted field segments, numeric indices (`spec.ports[0]`), a
//! wildcard index (`items[*].name`) and bracketed keys for fields that
//! contain dots (`metadata.labels[app.kubernetes.io/name]`).

pub mod errors;
pub mod paved;
pub mod path;

pub use errors::FieldPathError;
pub use paved::Paved;
pub use path::{FieldPath, Segment};
