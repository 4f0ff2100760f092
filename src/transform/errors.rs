use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("transform at index {index} returned error: {source}")]
    AtIndex {
        index: usize,
        #[source]
        source: Box<TransformError>,
    },

    #[error("input for map transform must be a string, found {found}")]
    MapInputNotString { found: &'static str },

    #[error("key {key} is not found in map")]
    MapKeyNotFound { key: String },

    #[error("input for math transform must be a number, found {found}")]
    MathInputNotNumber { found: &'static str },

    #[error("math transform overflowed multiplying {input} by {factor}")]
    MathOverflow { input: i64, factor: i64 },

    #[error("math transform overflowed multiplying {input} by {factor}")]
    MathFloatOverflow { input: f64, factor: i64 },

    #[error("cannot convert {found} to {to}")]
    ConversionNotSupported { found: &'static str, to: String },

    #[error("cannot parse '{input}' as {to}")]
    ConversionFailed { input: String, to: String },

    #[error("invalid regexp '{pattern}': {message}")]
    InvalidRegexp { pattern: String, message: String },

    #[error("regexp '{pattern}' had no matches for group {group}")]
    RegexpNoMatch { pattern: String, group: usize },

    #[error("cannot decode base64: {message}")]
    InvalidBase64 { message: String },

    #[error("cannot encode value as JSON: {message}")]
    Json { message: String },
}

impl TransformError {
    /// Index of the failing transform, when raised by a pipeline.
    pub fn index(&self) -> Option<usize> {
        match self {
            TransformError::AtIndex { index, .. } => Some(*index),
            _ => None,
        }
    }
}
