//! metadata.rs - Recursive sanitizer for open JSON payloads.
//!
//! Used for every `metadata` map and for object-valued fields and items.
//! Strings are passed through the engine, numbers/booleans/null are kept,
//! arrays and objects are walked up to `max_metadata_depth` levels.
//!
//! License: MIT OR APACHE 2.0

use serde_json::Value;

use crate::config::Limits;
use crate::engine::SanitizationEngine;
use crate::errors::SanitizeError;
use crate::model::Metadata;

/// Sanitizes a metadata map into a fresh copy.
///
/// Keys are sanitized like values (with the `metadata_key` cap); a key that
/// sanitizes to the empty string is dropped. When two keys collapse to the
/// same sanitized key, the later one in map order wins.
pub fn sanitize_metadata(
    engine: &dyn SanitizationEngine,
    map: &Metadata,
    limits: &Limits,
) -> Result<Metadata, SanitizeError> {
    sanitize_map(engine, map, limits, 1)
}

fn sanitize_map(
    engine: &dyn SanitizationEngine,
    map: &Metadata,
    limits: &Limits,
    depth: usize,
) -> Result<Metadata, SanitizeError> {
    if depth > limits.max_metadata_depth {
        return Err(SanitizeError::DepthExceeded {
            limit: limits.max_metadata_depth,
        });
    }

    let mut out = Metadata::new();
    for (key, value) in map {
        let clean_key = engine.sanitize_text(key, limits.lengths.metadata_key)?;
        if clean_key.is_empty() {
            continue;
        }
        let clean_value = sanitize_value(engine, value, limits, depth)?;
        out.insert(clean_key, clean_value);
    }
    Ok(out)
}

fn sanitize_value(
    engine: &dyn SanitizationEngine,
    value: &Value,
    limits: &Limits,
    depth: usize,
) -> Result<Value, SanitizeError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Number(n) => Ok(Value::Number(n.clone())),
        Value::String(s) => engine
            .sanitize_text(s, limits.lengths.metadata_value)
            .map(Value::String),
        Value::Array(items) => {
            if depth + 1 > limits.max_metadata_depth {
                return Err(SanitizeError::DepthExceeded {
                    limit: limits.max_metadata_depth,
                });
            }
            items
                .iter()
                .map(|item| sanitize_value(engine, item, limits, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Value::Object(map) => sanitize_map(engine, map, limits, depth + 1).map(Value::Object),
    }
}
