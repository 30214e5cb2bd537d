//! NormalizedEvent Definition
//!
//! The unified representation every source adapter produces. Events are built
//! fresh for each aggregation request and never mutated afterwards.
//!
//! On the wire the three sources keep their historical shapes: host-IDS
//! alerts serialize to a fixed field set, while network-IDS and correlation
//! records are the upstream object with the normalized defaults filled in.

use crate::classify::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which upstream feed an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "host-ids")]
    HostIds,
    #[serde(rename = "network-ids")]
    NetworkIds,
    #[serde(rename = "correlation")]
    Correlation,
}

impl SourceKind {
    /// Fixed merge order
    pub const ALL: [SourceKind; 3] = [
        SourceKind::HostIds,
        SourceKind::NetworkIds,
        SourceKind::Correlation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::HostIds => "host-ids",
            SourceKind::NetworkIds => "network-ids",
            SourceKind::Correlation => "correlation",
        }
    }

    /// Key of this source's list in the logs response
    pub fn response_key(&self) -> &'static str {
        match self {
            SourceKind::HostIds => "wazuh_logs",
            SourceKind::NetworkIds => "snort_logs",
            SourceKind::Correlation => "correlation_logs",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    /// Accepts the canonical tags plus the names older dashboards send
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host-ids" | "hids" | "wazuh" => Ok(SourceKind::HostIds),
            "network-ids" | "nids" | "snort" => Ok(SourceKind::NetworkIds),
            "correlation" | "correlated" => Ok(SourceKind::Correlation),
            other => Err(format!("unknown source: {}", other)),
        }
    }
}

/// Agent and rule fields only host-IDS alerts carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostAlertDetail {
    pub agent_name: String,
    pub agent_ip: String,
    pub rule_level: i64,
    pub rule_description: String,
}

/// A security event in the unified schema
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub id: String,
    pub timestamp: String,
    pub source: SourceKind,
    pub source_ip: String,
    pub dest_ip: String,
    pub event_type: String,
    pub severity: Severity,
    pub description: String,
    /// Present for host-IDS events only
    pub host_detail: Option<HostAlertDetail>,
    /// Original upstream record
    pub raw: Value,
}

/// Wire shape of a host-IDS alert
#[derive(Debug, Serialize)]
struct HostAlertRecord<'a> {
    id: &'a str,
    timestamp: &'a str,
    agent_name: &'a str,
    agent_ip: &'a str,
    rule_level: i64,
    rule_description: &'a str,
    source_ip: &'a str,
    dest_ip: &'a str,
    event_type: &'a str,
    severity: Severity,
    description: &'a str,
    raw_data: &'a Value,
}

impl NormalizedEvent {
    /// Serialize into the per-source response shape
    pub fn to_wire(&self) -> serde_json::Result<Value> {
        match (&self.source, &self.host_detail) {
            (SourceKind::HostIds, Some(detail)) => serde_json::to_value(HostAlertRecord {
                id: &self.id,
                timestamp: &self.timestamp,
                agent_name: &detail.agent_name,
                agent_ip: &detail.agent_ip,
                rule_level: detail.rule_level,
                rule_description: &detail.rule_description,
                source_ip: &self.source_ip,
                dest_ip: &self.dest_ip,
                event_type: &self.event_type,
                severity: self.severity,
                description: &self.description,
                raw_data: &self.raw,
            }),
            _ => Ok(self.passthrough_record()),
        }
    }

    /// The upstream object with missing normalized keys filled in.
    /// Keys the upstream already set are left untouched.
    fn passthrough_record(&self) -> Value {
        let mut record = match &self.raw {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let defaults = [
            ("id", Value::String(self.id.clone())),
            ("timestamp", Value::String(self.timestamp.clone())),
            ("source_ip", Value::String(self.source_ip.clone())),
            ("dest_ip", Value::String(self.dest_ip.clone())),
            ("event_type", Value::String(self.event_type.clone())),
            ("severity", Value::String(self.severity.to_string())),
            ("description", Value::String(self.description.clone())),
        ];
        for (key, value) in defaults {
            let missing = match record.get(key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                record.insert(key.to_string(), value);
            }
        }
        Value::Object(record)
    }
}
