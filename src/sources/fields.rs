//! Optional-field resolution for upstream records
//!
//! Each normalized field has an ordered list of candidate paths. The first
//! candidate holding a usable value wins; otherwise the caller's default
//! applies. Empty strings and nulls count as absent.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Placeholder for missing IP fields
pub const UNKNOWN: &str = "unknown";

/// Walk a dotted path such as `agent.ip`.
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
        .filter(|value| !value.is_null())
}

/// Render a scalar as text; objects, arrays and blank strings yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate path holding a non-empty scalar.
pub fn resolve_str(record: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| lookup(record, path).and_then(scalar_text))
}

/// Like `resolve_str` with a fallback.
pub fn resolve_or(record: &Value, paths: &[&str], default: &str) -> String {
    resolve_str(record, paths).unwrap_or_else(|| default.to_string())
}

/// Coerce a rule level or risk score to an integer. Missing or unusable values are 0.
pub fn coerce_score(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

pub fn synthetic_id() -> String {
    Uuid::new_v4().to_string()
}

/// Fetch time in the same ISO-8601 form the responses use
pub fn fetch_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}
