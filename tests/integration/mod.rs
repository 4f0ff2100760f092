//! Cross-module integration and property tests

mod fieldpath;
mod properties;
