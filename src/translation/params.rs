/*!
 * Custom parameter resolution for backend requests.
 *
 * Backends accept extra provider-specific parameters (temperature, top_p,
 * penalties, ...) configured as a JSON-encoded array of `{key, value}`
 * objects in the settings store. This module turns that string into typed
 * key/value pairs ready to merge into an outbound request body.
 *
 * Resolution never fails: absent, empty or malformed input degrades to
 * "no parameters" (malformed input is logged), so callers can always treat
 * the result as valid.
 */

use log::error;
use serde_json::Value;

/// A typed custom parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum CustomParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CustomParamValue {
    /// JSON representation for request body merging
    pub fn to_json(&self) -> Value {
        match self {
            CustomParamValue::Str(s) => Value::String(s.clone()),
            CustomParamValue::Int(i) => Value::from(*i),
            CustomParamValue::Float(f) => Value::from(*f),
            CustomParamValue::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Resolved (key, typed value) pairs in configuration order
pub type CustomParams = Vec<(String, CustomParamValue)>;

/// Parse custom parameters from a raw settings value.
///
/// Typing rules: a JSON string that parses as a float (invariant format)
/// becomes `Float`, otherwise stays `Str`; a JSON number becomes `Int` when
/// it round-trips exactly as i64, else `Float`; booleans map directly; any
/// other JSON shape falls back to its string form. Entries without both a
/// `key` and a `value` are skipped.
pub fn resolve_custom_parameters(raw: Option<&str>) -> CustomParams {
    let raw = match raw {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Vec::new(),
    };

    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to parse custom parameters: {} (input: {})", e, raw);
            return Vec::new();
        }
    };

    let mut params = Vec::new();
    for entry in entries {
        let Some(key) = entry.get("key").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = entry.get("value") else {
            continue;
        };

        let typed = match value {
            Value::String(s) => coerce_numeric(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CustomParamValue::Int(i),
                None => CustomParamValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::Bool(b) => CustomParamValue::Bool(*b),
            other => CustomParamValue::Str(other.to_string()),
        };

        params.push((key.to_string(), typed));
    }

    params
}

/// Numeric-looking strings coerce to floats, everything else stays a string
fn coerce_numeric(value: &str) -> CustomParamValue {
    match value.trim().parse::<f64>() {
        Ok(f) if f.is_finite() => CustomParamValue::Float(f),
        _ => CustomParamValue::Str(value.to_string()),
    }
}
