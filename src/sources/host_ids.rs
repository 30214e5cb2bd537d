//! Host-IDS alert adapter
//!
//! The host-IDS manager exposes its alert log as newline-delimited JSON, one
//! alert object per line, oldest first. Only raw rule fields are present, so
//! severity and event type are derived here.

use super::fields::{self, UNKNOWN};
use super::{degrade, fetch_within, AdapterOutcome, DegradedReason, Feed, SourceAdapter};
use crate::classify::{classify_event_type, classify_severity};
use crate::event::{HostAlertDetail, NormalizedEvent, SourceKind};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const UNKNOWN_RULE: &str = "Unknown event";
const DEFAULT_DESCRIPTION: &str = "Security event detected";

pub struct HostIdsAdapter {
    feed: Arc<dyn Feed>,
    budget: Duration,
}

impl HostIdsAdapter {
    pub fn new(feed: Arc<dyn Feed>, budget: Duration) -> Self {
        Self { feed, budget }
    }
}

#[async_trait]
impl SourceAdapter for HostIdsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::HostIds
    }

    async fn fetch(&self, limit: usize) -> AdapterOutcome {
        let body = match fetch_within(self.feed.as_ref(), limit, self.budget).await {
            Ok(body) => body,
            Err(reason) => return degrade(self.kind(), reason),
        };
        let fetched_at = fields::fetch_timestamp();
        match parse_alert_stream(&body, limit, &fetched_at) {
            Ok(events) => AdapterOutcome::Ok(events),
            Err(reason) => degrade(self.kind(), reason),
        }
    }
}

/// Parse an NDJSON alert stream into the latest `limit` events, newest first.
///
/// Blank and malformed lines are skipped one by one. The payload is only
/// rejected when it has content and not a single line parses.
pub fn parse_alert_stream(
    body: &str,
    limit: usize,
    fetched_at: &str,
) -> Result<Vec<NormalizedEvent>, DegradedReason> {
    let mut alerts = Vec::new();
    let mut malformed = 0usize;

    for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(alert @ Value::Object(_)) => alerts.push(alert),
            _ => malformed += 1,
        }
    }

    if malformed > 0 {
        debug!(malformed, parsed = alerts.len(), "Skipped malformed host-IDS lines");
        if alerts.is_empty() {
            return Err(DegradedReason::MalformedPayload(format!(
                "none of {} host-IDS lines parsed as JSON objects",
                malformed
            )));
        }
    }

    let oldest_kept = alerts.len().saturating_sub(limit);
    Ok(alerts
        .into_iter()
        .skip(oldest_kept)
        .rev()
        .map(|alert| normalize_alert(alert, fetched_at))
        .collect())
}

/// Map one raw alert onto the normalized schema
pub fn normalize_alert(alert: Value, fetched_at: &str) -> NormalizedEvent {
    let rule_level = fields::coerce_score(fields::lookup(&alert, "rule.level"));
    let rule_description = fields::resolve_str(&alert, &["rule.description"]);
    let event_type = classify_event_type(rule_description.as_deref().unwrap_or_default());

    NormalizedEvent {
        id: fields::resolve_str(&alert, &["id"]).unwrap_or_else(fields::synthetic_id),
        timestamp: fields::resolve_or(&alert, &["timestamp"], fetched_at),
        source: SourceKind::HostIds,
        source_ip: fields::resolve_or(&alert, &["data.srcip", "agent.ip"], UNKNOWN),
        dest_ip: fields::resolve_or(&alert, &["data.dstip"], UNKNOWN),
        event_type: event_type.label().to_string(),
        severity: classify_severity(rule_level),
        description: rule_description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        host_detail: Some(HostAlertDetail {
            agent_name: fields::resolve_or(&alert, &["agent.name"], UNKNOWN),
            agent_ip: fields::resolve_or(&alert, &["agent.ip"], UNKNOWN),
            rule_level,
            rule_description: rule_description.unwrap_or_else(|| UNKNOWN_RULE.to_string()),
        }),
        raw: alert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Severity;
    use crate::sources::testing::{FailingFeed, StaticFeed};
    use serde_json::json;

    const FETCHED_AT: &str = "2024-05-01T12:00:00+00:00";

    fn alert_line(id: &str, level: i64, description: &str) -> String {
        json!({
            "id": id,
            "timestamp": format!("2024-05-01T10:00:0{}+00:00", id),
            "agent": { "name": "web-01", "ip": "10.0.0.5" },
            "rule": { "level": level, "description": description },
            "data": { "srcip": "203.0.113.9" }
        })
        .to_string()
    }

    #[test]
    fn test_blank_lines_are_skipped_and_order_is_newest_first() {
        let body = format!(
            "{}\n\n{}\n   \n{}\n",
            alert_line("1", 3, "Integrity checksum changed"),
            alert_line("2", 7, "sshd: brute force trying to get access"),
            alert_line("3", 12, "Multiple web attack attempts"),
        );

        let events = parse_alert_stream(&body, 100, FETCHED_AT).unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
        assert_eq!(events[0].severity, Severity::Critical);
        assert_eq!(events[0].event_type, "Attack");
        assert_eq!(events[1].event_type, "SSH Activity");
        assert_eq!(events[2].severity, Severity::Low);
    }

    #[test]
    fn test_limit_keeps_most_recent_alerts() {
        let body: Vec<String> = (1..=5)
            .map(|i| alert_line(&i.to_string(), 5, "login failed"))
            .collect();
        let events = parse_alert_stream(&body.join("\n"), 2, FETCHED_AT).unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4"]);
    }

    #[test]
    fn test_malformed_lines_are_skipped_individually() {
        let body = format!(
            "{}\n{{not json\n[1,2,3]\n{}",
            alert_line("1", 4, "Port scan detected"),
            alert_line("2", 4, "Port scan detected"),
        );
        let events = parse_alert_stream(&body, 10, FETCHED_AT).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_all_malformed_payload_is_degraded() {
        let result = parse_alert_stream("<html>502 Bad Gateway</html>", 10, FETCHED_AT);
        assert!(matches!(result, Err(DegradedReason::MalformedPayload(_))));
        assert_eq!(parse_alert_stream("\n\n", 10, FETCHED_AT), Ok(Vec::new()));
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let event = normalize_alert(json!({ "rule": {} }), FETCHED_AT);
        let detail = event.host_detail.as_ref().unwrap();

        assert!(!event.id.is_empty());
        assert_eq!(event.timestamp, FETCHED_AT);
        assert_eq!(event.source_ip, "unknown");
        assert_eq!(event.dest_ip, "unknown");
        assert_eq!(event.severity, Severity::Low);
        assert_eq!(event.event_type, "Security Event");
        assert_eq!(event.description, "Security event detected");
        assert_eq!(detail.rule_description, "Unknown event");
        assert_eq!(detail.agent_name, "unknown");
        assert_eq!(detail.rule_level, 0);
    }

    #[test]
    fn test_source_ip_falls_back_to_agent_ip() {
        let event = normalize_alert(
            json!({
                "agent": { "ip": "10.0.0.7" },
                "rule": { "level": "9", "description": "Snort alert relayed" },
                "data": { "dstip": "10.0.0.1" }
            }),
            FETCHED_AT,
        );
        assert_eq!(event.source_ip, "10.0.0.7");
        assert_eq!(event.dest_ip, "10.0.0.1");
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.event_type, "Snort IDS");
    }

    #[tokio::test]
    async fn test_adapter_round_trip() {
        let body = format!(
            "{}\n\n{}\n\n{}",
            alert_line("1", 2, "a"),
            alert_line("2", 5, "b"),
            alert_line("3", 8, "c"),
        );
        let feed = StaticFeed::new(body);
        let adapter = HostIdsAdapter::new(feed.clone(), DEFAULT_TIMEOUT);

        let events = adapter.fetch(100).await.into_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].id, "3");
        assert_eq!(feed.calls(), 1);
    }

    #[tokio::test]
    async fn test_adapter_degrades_on_upstream_error() {
        let adapter = HostIdsAdapter::new(Arc::new(FailingFeed(503)), DEFAULT_TIMEOUT);
        let outcome = adapter.fetch(100).await;
        assert_eq!(outcome.degraded(), Some(&DegradedReason::UpstreamStatus(503)));
    }
}
