//! Severity and event-type classification
//!
//! Both classifiers are pure and total. Host-IDS alerts only carry a numeric
//! rule level and a free-text rule description, so these two functions are
//! what turn them into dashboard-ready tiers and categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scores at or above this are `Critical`
pub const CRITICAL_THRESHOLD: i64 = 12;
/// Scores at or above this are `High`
pub const HIGH_THRESHOLD: i64 = 7;
/// Scores at or above this are `Medium`
pub const MEDIUM_THRESHOLD: i64 = 4;

/// Severity tier of a normalized event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity tier: {}", other)),
        }
    }
}

/// Map a numeric risk score onto a severity tier.
///
/// Lower bounds are inclusive: 12 is critical, 7 is high, 4 is medium.
/// Negative scores are low.
pub fn classify_severity(score: i64) -> Severity {
    if score >= CRITICAL_THRESHOLD {
        Severity::Critical
    } else if score >= HIGH_THRESHOLD {
        Severity::High
    } else if score >= MEDIUM_THRESHOLD {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Event category inferred from an alert description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    NetworkIds,
    Correlation,
    SshActivity,
    Authentication,
    PortScan,
    Attack,
    SecurityEvent,
}

/// Keyword table checked in order; the first hit wins.
const KEYWORD_TABLE: [(&str, EventType); 6] = [
    ("snort", EventType::NetworkIds),
    ("correlation", EventType::Correlation),
    ("ssh", EventType::SshActivity),
    ("login", EventType::Authentication),
    ("scan", EventType::PortScan),
    ("attack", EventType::Attack),
];

impl EventType {
    pub fn label(&self) -> &'static str {
        match self {
            EventType::NetworkIds => "Snort IDS",
            EventType::Correlation => "Correlation",
            EventType::SshActivity => "SSH Activity",
            EventType::Authentication => "Authentication",
            EventType::PortScan => "Port Scan",
            EventType::Attack => "Attack",
            EventType::SecurityEvent => "Security Event",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Infer an event category from free text.
pub fn classify_event_type(description: &str) -> EventType {
    let description = description.to_lowercase();
    KEYWORD_TABLE
        .iter()
        .find(|(keyword, _)| description.contains(keyword))
        .map(|(_, event_type)| *event_type)
        .unwrap_or(EventType::SecurityEvent)
}
