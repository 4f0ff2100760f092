//! Combine strategies: merge several extracted values into one.
//!
//! Strategies live in a [`CombinerRegistry`] keyed by the name used in
//! `combine.strategy`. The built-in registry carries the `string` strategy.

use crate::config::schema::Combine;
use crate::transform::sprintf;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

pub const STRATEGY_STRING: &str = "string";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error("combine strategy {strategy} is not supported")]
    StrategyNotSupported { strategy: String },

    #[error("given combine strategy {strategy} requires configuration")]
    ConfigMissing { strategy: String },
}

/// A combine strategy: a pure function of the combine spec and the values
/// extracted for its variables, in declared order.
pub type CombineFn = fn(&Combine, &[Value]) -> Result<Value, CombineError>;

#[derive(Debug, Clone)]
pub struct CombinerRegistry {
    combiners: HashMap<String, CombineFn>,
}

impl CombinerRegistry {
    /// A registry with no strategies.
    pub fn empty() -> Self {
        Self {
            combiners: HashMap::new(),
        }
    }

    /// The shared registry of built-in strategies.
    pub fn builtin() -> &'static CombinerRegistry {
        static BUILTIN: OnceLock<CombinerRegistry> = OnceLock::new();
        BUILTIN.get_or_init(CombinerRegistry::default)
    }

    pub fn register(&mut self, strategy: impl Into<String>, combiner: CombineFn) -> &mut Self {
        self.combiners.insert(strategy.into(), combiner);
        self
    }

    pub fn contains(&self, strategy: &str) -> bool {
        self.combiners.contains_key(strategy)
    }

    pub fn combine(&self, combine: &Combine, values: &[Value]) -> Result<Value, CombineError> {
        let combiner = self.combiners.get(combine.strategy.as_str()).ok_or_else(|| {
            CombineError::StrategyNotSupported {
                strategy: combine.strategy.clone(),
            }
        })?;
        combiner(combine, values)
    }
}

impl Default for CombinerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(STRATEGY_STRING, combine_string_strategy);
        registry
    }
}

/// Combines `values` with the built-in strategies.
pub fn combine(combine: &Combine, values: &[Value]) -> Result<Value, CombineError> {
    CombinerRegistry::builtin().combine(combine, values)
}

/// Formats `values` positionally into `format`.
pub fn combine_string(format: &str, values: &[Value]) -> String {
    sprintf(format, values)
}

fn combine_string_strategy(combine: &Combine, values: &[Value]) -> Result<Value, CombineError> {
    let config = combine
        .string
        .as_ref()
        .ok_or_else(|| CombineError::ConfigMissing {
            strategy: combine.strategy.clone(),
        })?;
    Ok(Value::String(combine_string(&config.format, values)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_strategy_formats_values() {
        let spec = Combine::string("%s-%s", &["spec.a", "spec.b"]);
        assert_eq!(
            combine(&spec, &[json!("a"), json!("b")]).unwrap(),
            json!("a-b")
        );
    }

    #[test]
    fn string_strategy_honours_width_and_precision() {
        let spec = Combine::string("node-%03d-%.2f", &["spec.index", "spec.weight"]);
        assert_eq!(
            combine(&spec, &[json!(5), json!(1.23456)]).unwrap(),
            json!("node-005-1.23")
        );
    }

    #[test]
    fn string_strategy_requires_config() {
        let mut spec = Combine::string("%s", &["spec.a"]);
        spec.string = None;
        assert_eq!(
            combine(&spec, &[json!("a")]).unwrap_err(),
            CombineError::ConfigMissing {
                strategy: "string".to_string()
            }
        );
    }

    #[test]
    fn unknown_strategy_is_not_supported() {
        let mut spec = Combine::string("%s", &["spec.a"]);
        spec.strategy = "concat".to_string();
        let err = combine(&spec, &[json!("a")]).unwrap_err();
        assert_eq!(err.to_string(), "combine strategy concat is not supported");
    }

    #[test]
    fn custom_strategy_can_be_registered() {
        fn join(_: &Combine, values: &[Value]) -> Result<Value, CombineError> {
            Ok(Value::Array(values.to_vec()))
        }

        let mut registry = CombinerRegistry::default();
        registry.register("list", join);
        assert!(registry.contains("list"));

        let mut spec = Combine::string("%s", &["a", "b"]);
        spec.strategy = "list".to_string();
        assert_eq!(
            registry.combine(&spec, &[json!(1), json!(2)]).unwrap(),
            json!([1, 2])
        );
    }
}
