use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("invalid field path '{input}': {message}")]
    InvalidPath { input: String, message: String },

    #[error("{path}: no such field")]
    NotFound { path: String },

    #[error("{path}: expected {expected}, found {found}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{path}: unexpected wildcard usage")]
    UnexpectedWildcard { path: String },

    #[error("{path}: index exceeds the maximum array length {limit}")]
    IndexOutOfRange { path: String, limit: usize },
}

impl FieldPathError {
    /// Returns true when the error means the addressed value does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FieldPathError::NotFound { .. })
    }
}
