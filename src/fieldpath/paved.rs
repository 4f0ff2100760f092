//! Get, set and wildcard expansion over a `serde_json::Value` tree.

use crate::fieldpath::errors::FieldPathError;
use crate::fieldpath::path::{FieldPath, Segment};
use serde_json::{Map, Value};

/// Largest array `set_value` will grow to when padding with nulls.
pub const MAX_ARRAY_LEN: usize = 1 << 16;

/// An owned JSON-like document addressed by field paths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paved {
    object: Value,
}

impl Paved {
    pub fn new(object: Value) -> Self {
        Self { object }
    }

    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn into_inner(self) -> Value {
        self.object
    }

    /// Returns the value at `path`.
    pub fn get_value(&self, path: &str) -> Result<&Value, FieldPathError> {
        self.get_value_at(&FieldPath::parse(path)?)
    }

    pub fn get_value_at(&self, path: &FieldPath) -> Result<&Value, FieldPathError> {
        let mut current = &self.object;
        for (idx, segment) in path.segments().iter().enumerate() {
            let next = match segment {
                Segment::Field(name) => current.as_object().and_then(|map| map.get(name)),
                Segment::Index(index) => match current {
                    Value::Array(items) => items.get(*index),
                    Value::Object(map) => map.get(&index.to_string()),
                    _ => None,
                },
                Segment::Wildcard => {
                    return Err(FieldPathError::UnexpectedWildcard {
                        path: path.prefix(idx + 1).to_string(),
                    });
                }
            };
            current = next.ok_or_else(|| FieldPathError::NotFound {
                path: path.to_string(),
            })?;
        }
        Ok(current)
    }

    /// Writes `value` at `path`, creating intermediate mappings and sequences.
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<(), FieldPathError> {
        self.set_value_at(&FieldPath::parse(path)?, value)
    }

    pub fn set_value_at(&mut self, path: &FieldPath, value: Value) -> Result<(), FieldPathError> {
        let segments = path.segments();
        let mut current = &mut self.object;

        for (idx, segment) in segments.iter().enumerate() {
            let last = idx + 1 == segments.len();
            match segment {
                Segment::Field(name) => {
                    if current.is_null() {
                        *current = Value::Object(Map::new());
                    }
                    let map = match current {
                        Value::Object(map) => map,
                        other => return Err(unexpected_type(path, idx, "object", other)),
                    };
                    if last {
                        map.insert(name.clone(), value);
                        return Ok(());
                    }
                    current = map.entry(name.clone()).or_insert(Value::Null);
                }
                Segment::Index(index) => {
                    if current.is_null() {
                        *current = Value::Array(Vec::new());
                    }
                    match current {
                        Value::Array(items) => {
                            if items.len() <= *index {
                                let len = index
                                    .checked_add(1)
                                    .filter(|len| *len <= MAX_ARRAY_LEN)
                                    .ok_or_else(|| FieldPathError::IndexOutOfRange {
                                        path: path.prefix(idx + 1).to_string(),
                                        limit: MAX_ARRAY_LEN,
                                    })?;
                                items.resize(len, Value::Null);
                            }
                            if last {
                                items[*index] = value;
                                return Ok(());
                            }
                            current = &mut items[*index];
                        }
                        Value::Object(map) => {
                            if last {
                                map.insert(index.to_string(), value);
                                return Ok(());
                            }
                            current = map.entry(index.to_string()).or_insert(Value::Null);
                        }
                        other => return Err(unexpected_type(path, idx, "array", other)),
                    }
                }
                Segment::Wildcard => {
                    return Err(FieldPathError::UnexpectedWildcard {
                        path: path.prefix(idx + 1).to_string(),
                    });
                }
            }
        }

        // Only reachable for a path without segments, which the parser rejects.
        self.object = value;
        Ok(())
    }

    /// Expands every `[*]` in `path` to the indices (or keys) present in the
    /// document, in document order.
    ///
    /// A prefix that does not resolve contributes no paths; the result may be
    /// empty. Segments after the last wildcard need not exist yet.
    pub fn expand_wildcards(&self, path: &str) -> Result<Vec<FieldPath>, FieldPathError> {
        self.expand_wildcards_at(&FieldPath::parse(path)?)
    }

    pub fn expand_wildcards_at(&self, path: &FieldPath) -> Result<Vec<FieldPath>, FieldPathError> {
        let mut expanded = Vec::new();
        let mut prefix = Vec::with_capacity(path.segments().len());
        expand(&self.object, &mut prefix, path.segments(), &mut expanded)?;
        Ok(expanded)
    }
}

fn expand(
    node: &Value,
    prefix: &mut Vec<Segment>,
    rest: &[Segment],
    out: &mut Vec<FieldPath>,
) -> Result<(), FieldPathError> {
    if !rest.contains(&Segment::Wildcard) {
        let mut segments = prefix.clone();
        segments.extend_from_slice(rest);
        out.push(FieldPath::new(segments));
        return Ok(());
    }

    let (segment, tail) = match rest.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    match segment {
        Segment::Wildcard => match node {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    prefix.push(Segment::Index(index));
                    expand(item, prefix, tail, out)?;
                    prefix.pop();
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    prefix.push(Segment::Field(key.clone()));
                    expand(item, prefix, tail, out)?;
                    prefix.pop();
                }
            }
            Value::Null => {}
            _ => {
                let mut segments = prefix.clone();
                segments.push(Segment::Wildcard);
                return Err(FieldPathError::UnexpectedWildcard {
                    path: FieldPath::new(segments).to_string(),
                });
            }
        },
        Segment::Field(name) => {
            if let Some(child) = node.as_object().and_then(|map| map.get(name)) {
                prefix.push(segment.clone());
                expand(child, prefix, tail, out)?;
                prefix.pop();
            }
        }
        Segment::Index(index) => {
            let child = match node {
                Value::Array(items) => items.get(*index),
                Value::Object(map) => map.get(&index.to_string()),
                _ => None,
            };
            if let Some(child) = child {
                prefix.push(segment.clone());
                expand(child, prefix, tail, out)?;
                prefix.pop();
            }
        }
    }

    Ok(())
}

fn unexpected_type(
    path: &FieldPath,
    idx: usize,
    expected: &'static str,
    found: &Value,
) -> FieldPathError {
    FieldPathError::UnexpectedType {
        path: path.prefix(idx).to_string(),
        expected,
        found: type_name(found),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(paved: &Paved, path: &str) -> Vec<String> {
        paved
            .expand_wildcards(path)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn get_nested_value() {
        let paved = Paved::new(json!({"spec": {"ports": [{"port": 80}, {"port": 443}]}}));
        assert_eq!(paved.get_value("spec.ports[1].port").unwrap(), &json!(443));
    }

    #[test]
    fn get_missing_value_is_not_found() {
        let paved = Paved::new(json!({"spec": {"ports": []}}));
        for path in ["spec.region", "spec.ports[0]", "status.atProvider.id", "spec.ports.name"] {
            let err = paved.get_value(path).unwrap_err();
            assert!(err.is_not_found(), "{path}: {err}");
        }
    }

    #[test]
    fn set_creates_intermediate_nodes() {
        let mut paved = Paved::new(json!({}));
        paved.set_value("spec.forProvider.tags[1].key", json!("env")).unwrap();
        assert_eq!(
            paved.object(),
            &json!({"spec": {"forProvider": {"tags": [null, {"key": "env"}]}}})
        );
    }

    #[test]
    fn set_overwrites_existing_value() {
        let mut paved = Paved::new(json!({"spec": {"region": "us-west-2", "size": 1}}));
        paved.set_value("spec.region", json!("eu-central-1")).unwrap();
        assert_eq!(
            paved.object(),
            &json!({"spec": {"region": "eu-central-1", "size": 1}})
        );
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut paved = Paved::new(json!({"spec": "oops"}));
        let err = paved.set_value("spec.region", json!("x")).unwrap_err();
        assert_eq!(
            err,
            FieldPathError::UnexpectedType {
                path: "spec".to_string(),
                expected: "object",
                found: "string",
            }
        );
    }

    #[test]
    fn set_refuses_to_grow_past_limit() {
        let mut paved = Paved::new(json!({"items": ["a"]}));
        let err = paved.set_value("items[4000000000]", json!("x")).unwrap_err();
        assert_eq!(
            err,
            FieldPathError::IndexOutOfRange {
                path: "items[4000000000]".to_string(),
                limit: MAX_ARRAY_LEN,
            }
        );
        assert_eq!(paved.object(), &json!({"items": ["a"]}));
    }

    #[test]
    fn oversized_index_is_a_key() {
        let mut paved = Paved::new(json!({"items": ["a"]}));
        let err = paved
            .set_value("items[18446744073709551615]", json!("x"))
            .unwrap_err();
        assert!(matches!(err, FieldPathError::UnexpectedType { .. }));

        let mut paved = Paved::new(json!({"counts": {}}));
        paved
            .set_value("counts[18446744073709551615]", json!(1))
            .unwrap();
        assert_eq!(
            paved.object(),
            &json!({"counts": {"18446744073709551615": 1}})
        );
    }

    #[test]
    fn set_rejects_wildcards() {
        let mut paved = Paved::new(json!({"items": [{}]}));
        let err = paved.set_value("items[*].name", json!("x")).unwrap_err();
        assert!(matches!(err, FieldPathError::UnexpectedWildcard { .. }));
    }

    #[test]
    fn expand_array_wildcard() {
        let paved = Paved::new(json!({"items": [{"name": "a"}, {}, {"name": "c"}]}));
        assert_eq!(
            paths(&paved, "items[*].name"),
            vec!["items[0].name", "items[1].name", "items[2].name"]
        );
    }

    #[test]
    fn expand_nested_wildcards() {
        let paved = Paved::new(json!({
            "spec": {"rules": [{"ports": [1, 2]}, {"ports": []}, {"ports": [3]}]}
        }));
        assert_eq!(
            paths(&paved, "spec.rules[*].ports[*]"),
            vec![
                "spec.rules[0].ports[0]",
                "spec.rules[0].ports[1]",
                "spec.rules[2].ports[0]",
            ]
        );
    }

    #[test]
    fn expand_missing_prefix_is_empty() {
        let paved = Paved::new(json!({"spec": {}}));
        assert!(paths(&paved, "spec.items[*].name").is_empty());
        let paved = Paved::new(json!({"items": []}));
        assert!(paths(&paved, "items[*].name").is_empty());
    }

    #[test]
    fn expand_object_wildcard_uses_keys() {
        let paved = Paved::new(json!({"labels": {"a": "1", "b": "2"}}));
        assert_eq!(paths(&paved, "labels[*]"), vec!["labels.a", "labels.b"]);
    }

    #[test]
    fn expand_wildcard_on_scalar_fails() {
        let paved = Paved::new(json!({"items": "nope"}));
        let err = paved.expand_wildcards("items[*].name").unwrap_err();
        assert_eq!(
            err,
            FieldPathError::UnexpectedWildcard {
                path: "items[*]".to_string()
            }
        );
    }
}
