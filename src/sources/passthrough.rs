//! Shared handling for feeds whose records arrive pre-shaped
//!
//! The network-IDS and correlation services already emit dashboard-shaped
//! JSON. Records are passed through; only missing fields are resolved.

use super::fields::{self, UNKNOWN};
use super::DegradedReason;
use crate::classify::{classify_severity, Severity};
use crate::event::{NormalizedEvent, SourceKind};
use serde_json::Value;

/// Description keys checked before any source-specific fallback
pub(crate) const DESCRIPTION_KEYS: [&str; 4] = [
    "description",
    "message",
    "alert_description",
    "event_description",
];

pub(crate) const NO_DESCRIPTION: &str = "No description available";

/// Split a payload into records.
///
/// Accepts a bare array, an envelope object with a `logs` or `data` array,
/// or a single record object. Non-object array elements are dropped.
pub(crate) fn parse_records(body: &str) -> Result<Vec<Value>, DegradedReason> {
    let payload: Value = serde_json::from_str(body.trim())
        .map_err(|e| DegradedReason::MalformedPayload(e.to_string()))?;

    let records = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let envelope_key = ["logs", "data"]
                .into_iter()
                .find(|key| map.get(*key).map_or(false, Value::is_array));
            match envelope_key.and_then(|key| map.remove(key)) {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(map)],
            }
        }
        other => {
            return Err(DegradedReason::MalformedPayload(format!(
                "expected a JSON array or object, got {}",
                json_kind(&other)
            )))
        }
    };

    Ok(records.into_iter().filter(Value::is_object).collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Severity as the upstream reports it: a tier name in any case, or a score
pub(crate) fn resolve_severity(record: &Value) -> Severity {
    let value = fields::lookup(record, "severity");
    if let Some(tier) = value
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Severity>().ok())
    {
        return tier;
    }
    classify_severity(fields::coerce_score(value))
}

/// Build a normalized event from a pre-shaped record
pub(crate) fn normalize_record(
    record: Value,
    source: SourceKind,
    default_event_type: &str,
    description: String,
    fetched_at: &str,
) -> NormalizedEvent {
    NormalizedEvent {
        id: fields::resolve_str(&record, &["id"]).unwrap_or_else(fields::synthetic_id),
        timestamp: fields::resolve_or(&record, &["timestamp", "created_at"], fetched_at),
        source,
        source_ip: fields::resolve_or(&record, &["source_ip", "src_ip"], UNKNOWN),
        dest_ip: fields::resolve_or(&record, &["dest_ip", "dst_ip"], UNKNOWN),
        event_type: fields::resolve_or(&record, &["event_type"], default_event_type),
        severity: resolve_severity(&record),
        description,
        host_detail: None,
        raw: record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array_and_envelopes() {
        assert_eq!(parse_records(r#"[{"id":1},{"id":2}]"#).unwrap().len(), 2);
        assert_eq!(
            parse_records(r#"{"logs":[{"id":1}],"total":1}"#).unwrap(),
            vec![json!({ "id": 1 })]
        );
        assert_eq!(parse_records(r#"{"data":[]}"#).unwrap(), Vec::<Value>::new());
        assert_eq!(
            parse_records(r#"{"id":"single"}"#).unwrap(),
            vec![json!({ "id": "single" })]
        );
        assert_eq!(parse_records(r#"[{"id":1}, 7, "x", null]"#).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_records("not json"),
            Err(DegradedReason::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_records("42"),
            Err(DegradedReason::MalformedPayload(msg)) if msg.contains("a number")
        ));
        assert!(parse_records("").is_err());
    }

    #[test]
    fn test_resolve_severity_variants() {
        assert_eq!(resolve_severity(&json!({ "severity": "HIGH" })), Severity::High);
        assert_eq!(resolve_severity(&json!({ "severity": 12 })), Severity::Critical);
        assert_eq!(resolve_severity(&json!({ "severity": "5" })), Severity::Medium);
        assert_eq!(resolve_severity(&json!({ "severity": "weird" })), Severity::Low);
        assert_eq!(resolve_severity(&json!({})), Severity::Low);
    }

    #[test]
    fn test_normalize_record_defaults() {
        let event = normalize_record(
            json!({ "created_at": "2024-05-01 10:00:00", "src_ip": "10.1.1.1" }),
            SourceKind::NetworkIds,
            "Snort IDS",
            NO_DESCRIPTION.to_string(),
            "2024-05-01T12:00:00+00:00",
        );
        assert_eq!(event.timestamp, "2024-05-01 10:00:00");
        assert_eq!(event.source_ip, "10.1.1.1");
        assert_eq!(event.dest_ip, "unknown");
        assert_eq!(event.event_type, "Snort IDS");
        assert_eq!(event.severity, Severity::Low);
        assert!(!event.id.is_empty());
    }
}
