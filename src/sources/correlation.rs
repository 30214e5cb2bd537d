//! Correlation-event adapter
//!
//! Correlation events describe multi-stage attacks seen across host and
//! network sensors. Older correlation records keep their payload in a
//! `raw_json` string and only describe themselves through a correlation
//! type or their two stages, so the description lookup digs a little deeper
//! than the network-IDS one.

use super::fields;
use super::passthrough::{self, DESCRIPTION_KEYS, NO_DESCRIPTION};
use super::{degrade, fetch_within, AdapterOutcome, Feed, SourceAdapter};
use crate::classify::EventType;
use crate::event::{NormalizedEvent, SourceKind};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const UNKNOWN_STAGE: &str = "Unknown event";

pub struct CorrelationAdapter {
    feed: Arc<dyn Feed>,
    budget: Duration,
}

impl CorrelationAdapter {
    pub fn new(feed: Arc<dyn Feed>, budget: Duration) -> Self {
        Self { feed, budget }
    }
}

#[async_trait]
impl SourceAdapter for CorrelationAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Correlation
    }

    async fn fetch(&self, limit: usize) -> AdapterOutcome {
        let body = match fetch_within(self.feed.as_ref(), limit, self.budget).await {
            Ok(body) => body,
            Err(reason) => return degrade(self.kind(), reason),
        };
        let records = match passthrough::parse_records(&body) {
            Ok(records) => records,
            Err(reason) => return degrade(self.kind(), reason),
        };

        let fetched_at = fields::fetch_timestamp();
        AdapterOutcome::Ok(
            records
                .into_iter()
                .take(limit)
                .map(|record| normalize_correlation(record, &fetched_at))
                .collect(),
        )
    }
}

pub fn normalize_correlation(record: Value, fetched_at: &str) -> NormalizedEvent {
    let description = describe(&record);
    passthrough::normalize_record(
        record,
        SourceKind::Correlation,
        EventType::Correlation.label(),
        description,
        fetched_at,
    )
}

/// Description priority: the usual text fields, the correlation type, a
/// summary of both stages, then the same lookups inside `raw_json`.
fn describe(record: &Value) -> String {
    if let Some(text) = describe_from(record, true) {
        return text;
    }
    embedded_payload(record)
        .and_then(|embedded| describe_from(&embedded, false))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string())
}

fn describe_from(record: &Value, top_level: bool) -> Option<String> {
    let text_keys: &[&str] = if top_level {
        &DESCRIPTION_KEYS
    } else {
        &["message"]
    };
    fields::resolve_str(record, text_keys)
        .or_else(|| fields::resolve_str(record, &["correlation_type"]))
        .or_else(|| stage_summary(record))
}

/// "Correlated events: <stage one> → <stage two>" when both stages exist
fn stage_summary(record: &Value) -> Option<String> {
    let first = fields::lookup(record, "stage1")?;
    let second = fields::lookup(record, "stage2")?;
    let alert = |stage: &Value| {
        fields::resolve_or(stage, &["wazuh_alert"], UNKNOWN_STAGE)
    };
    Some(format!(
        "Correlated events: {} → {}",
        alert(first),
        alert(second)
    ))
}

/// `raw_json` may hold an encoded string or an already-decoded object
fn embedded_payload(record: &Value) -> Option<Value> {
    match fields::lookup(record, "raw_json")? {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded)
            .ok()
            .filter(Value::is_object),
        object @ Value::Object(_) => Some(object.clone()),
        _ => None,
    }
}
