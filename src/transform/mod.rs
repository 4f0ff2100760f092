//! Value transforms and the pipeline that applies them in order.

pub mod errors;
pub mod format;

pub use errors::TransformError;
pub use format::sprintf;

use crate::config::schema::{
    ConvertType, MathTransform, StringConversion, StringRegexp, StringTransform, Transform,
};
use crate::fieldpath::paved::type_name;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Applies `transforms` to `input` in declared order.
///
/// The first failure aborts the pipeline and reports the index of the
/// offending transform. An empty list returns `input` unchanged.
pub fn resolve_transforms(transforms: &[Transform], input: Value) -> Result<Value, TransformError> {
    transforms
        .iter()
        .enumerate()
        .try_fold(input, |value, (index, transform)| {
            resolve(transform, value).map_err(|source| TransformError::AtIndex {
                index,
                source: Box::new(source),
            })
        })
}

/// Applies a single transform.
pub fn resolve(transform: &Transform, input: Value) -> Result<Value, TransformError> {
    match transform {
        Transform::Map { map } => resolve_map(map, &input),
        Transform::Math { math } => resolve_math(math, &input),
        Transform::String { string } => resolve_string(string, &input),
        Transform::Convert { convert } => resolve_convert(convert.to_type, &input),
    }
}

fn resolve_map(map: &BTreeMap<String, Value>, input: &Value) -> Result<Value, TransformError> {
    let Value::String(key) = input else {
        return Err(TransformError::MapInputNotString {
            found: type_name(input),
        });
    };
    map.get(key)
        .cloned()
        .ok_or_else(|| TransformError::MapKeyNotFound { key: key.clone() })
}

fn resolve_math(math: &MathTransform, input: &Value) -> Result<Value, TransformError> {
    let Value::Number(number) = input else {
        return Err(TransformError::MathInputNotNumber {
            found: type_name(input),
        });
    };

    match math {
        MathTransform::Multiply { multiply } => {
            if let Some(int) = number.as_i64() {
                return int
                    .checked_mul(*multiply)
                    .map(Value::from)
                    .ok_or(TransformError::MathOverflow {
                        input: int,
                        factor: *multiply,
                    });
            }
            let input = number.as_f64().unwrap_or_default();
            Number::from_f64(input * (*multiply as f64))
                .map(Value::Number)
                .ok_or(TransformError::MathFloatOverflow {
                    input,
                    factor: *multiply,
                })
        }
        MathTransform::ClampMin { clamp_min } => {
            if number.as_f64().unwrap_or_default() < *clamp_min as f64 {
                Ok(Value::from(*clamp_min))
            } else {
                Ok(input.clone())
            }
        }
        MathTransform::ClampMax { clamp_max } => {
            if number.as_f64().unwrap_or_default() > *clamp_max as f64 {
                Ok(Value::from(*clamp_max))
            } else {
                Ok(input.clone())
            }
        }
    }
}

fn resolve_string(string: &StringTransform, input: &Value) -> Result<Value, TransformError> {
    let out = match string {
        StringTransform::Format { fmt } => sprintf(fmt, std::slice::from_ref(input)),
        StringTransform::Convert { convert } => convert_string(*convert, input)?,
        StringTransform::TrimPrefix { trim } => {
            let s = format::display(input);
            s.strip_prefix(trim.as_str()).unwrap_or(&s).to_string()
        }
        StringTransform::TrimSuffix { trim } => {
            let s = format::display(input);
            s.strip_suffix(trim.as_str()).unwrap_or(&s).to_string()
        }
        StringTransform::Regexp { regexp } => match_regexp(regexp, &format::display(input))?,
    };
    Ok(Value::String(out))
}

fn convert_string(convert: StringConversion, input: &Value) -> Result<String, TransformError> {
    match convert {
        StringConversion::ToUpper => Ok(format::display(input).to_uppercase()),
        StringConversion::ToLower => Ok(format::display(input).to_lowercase()),
        StringConversion::ToBase64 => Ok(BASE64.encode(format::display(input))),
        StringConversion::FromBase64 => {
            let decoded = BASE64
                .decode(format::display(input))
                .map_err(|e| TransformError::InvalidBase64 {
                    message: e.to_string(),
                })?;
            String::from_utf8(decoded).map_err(|e| TransformError::InvalidBase64 {
                message: e.to_string(),
            })
        }
        StringConversion::ToJson => serde_json::to_string(input).map_err(|e| TransformError::Json {
            message: e.to_string(),
        }),
    }
}

fn match_regexp(regexp: &StringRegexp, input: &str) -> Result<String, TransformError> {
    let re = Regex::new(&regexp.pattern).map_err(|e| TransformError::InvalidRegexp {
        pattern: regexp.pattern.clone(),
        message: e.to_string(),
    })?;
    let group = regexp.group.unwrap_or(0);
    re.captures(input)
        .and_then(|captures| captures.get(group))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| TransformError::RegexpNoMatch {
            pattern: regexp.pattern.clone(),
            group,
        })
}

fn resolve_convert(to: ConvertType, input: &Value) -> Result<Value, TransformError> {
    let unsupported = || TransformError::ConversionNotSupported {
        found: type_name(input),
        to: to.to_string(),
    };
    let failed = |s: &str| TransformError::ConversionFailed {
        input: s.to_string(),
        to: to.to_string(),
    };

    match (to, input) {
        (ConvertType::String, Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
            Ok(Value::String(format::display(input)))
        }
        (ConvertType::Int64, Value::Number(n)) => match n.as_i64() {
            Some(int) => Ok(Value::from(int)),
            None => n
                .as_f64()
                .map(|f| Value::from(f.trunc() as i64))
                .ok_or_else(unsupported),
        },
        (ConvertType::Int64, Value::String(s)) => {
            s.trim().parse::<i64>().map(Value::from).map_err(|_| failed(s))
        }
        (ConvertType::Int64, Value::Bool(b)) => Ok(Value::from(i64::from(*b))),
        (ConvertType::Float64, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(unsupported),
        (ConvertType::Float64, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| failed(s)),
        (ConvertType::Float64, Value::Bool(b)) => {
            Ok(Value::from(if *b { 1.0 } else { 0.0 }))
        }
        (ConvertType::Bool, Value::Bool(_)) => Ok(input.clone()),
        (ConvertType::Bool, Value::String(s)) => {
            parse_bool(s).map(Value::Bool).ok_or_else(|| failed(s))
        }
        _ => Err(unsupported()),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
