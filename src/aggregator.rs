//! Fan-out over the source adapters
//!
//! One aggregation runs every applicable adapter concurrently, each inside
//! its own budget, and collects the per-source lists unchanged. Nothing is
//! cached between requests.

use crate::classify::Severity;
use crate::config::{Config, HARD_LIMIT_CEILING};
use crate::error_handling::{SiemError, SiemResult};
use crate::event::{NormalizedEvent, SourceKind};
use crate::sources::{
    AdapterOutcome, CorrelationAdapter, DegradedReason, HostIdsAdapter, HttpFeed,
    NetworkIdsAdapter, SourceAdapter,
};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Which sources a request covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    #[default]
    All,
    Only(SourceKind),
}

impl SourceFilter {
    pub fn includes(&self, kind: SourceKind) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Only(only) => *only == kind,
        }
    }

    /// Absent, `all` and unrecognized values all mean every source
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse::<SourceKind>().ok())
            .map_or(SourceFilter::All, SourceFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRequest {
    pub limit: usize,
    pub filter: SourceFilter,
}

/// How one queried source fared
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source: SourceKind,
    pub count: usize,
    pub degraded: Option<DegradedReason>,
}

/// Per-source event lists from one aggregation
#[derive(Debug, Clone)]
pub struct AggregatedLogs {
    pub host_ids: Vec<NormalizedEvent>,
    pub network_ids: Vec<NormalizedEvent>,
    pub correlation: Vec<NormalizedEvent>,
    /// Sum of the per-source counts, duplicates included
    pub total_count: usize,
    pub timestamp: DateTime<Utc>,
    pub reports: Vec<SourceReport>,
}

impl AggregatedLogs {
    pub fn events(&self, kind: SourceKind) -> &[NormalizedEvent] {
        match kind {
            SourceKind::HostIds => &self.host_ids,
            SourceKind::NetworkIds => &self.network_ids,
            SourceKind::Correlation => &self.correlation,
        }
    }

    /// All events in the fixed source order, no cross-source sorting
    pub fn merged(&self) -> impl Iterator<Item = &NormalizedEvent> + '_ {
        SourceKind::ALL
            .into_iter()
            .flat_map(move |kind| self.events(kind).iter())
    }

    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    pub fn summary(&self) -> LogSummary {
        let mut severity: BTreeMap<Severity, usize> =
            Severity::ALL.into_iter().map(|tier| (tier, 0)).collect();
        for event in self.merged() {
            *severity.entry(event.severity).or_default() += 1;
        }

        let activity = SourceKind::ALL
            .into_iter()
            .map(|kind| {
                let mut histogram = HourlyActivity::default();
                for event in self.events(kind) {
                    histogram.record(&event.timestamp);
                }
                (kind.as_str(), histogram)
            })
            .collect();

        LogSummary {
            counts: SourceKind::ALL
                .into_iter()
                .map(|kind| (kind.as_str(), self.events(kind).len()))
                .collect(),
            critical: severity.get(&Severity::Critical).copied().unwrap_or_default(),
            severity,
            total_count: self.total_count,
            timestamp: self.timestamp_rfc3339(),
            degraded: self
                .reports
                .iter()
                .filter_map(|report| {
                    report.degraded.as_ref().map(|reason| DegradedSource {
                        source: report.source,
                        reason: reason.to_string(),
                    })
                })
                .collect(),
            activity,
        }
    }
}

/// Events per hour of day for one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HourlyActivity {
    /// Index is the hour, UTC when the timestamp carries an offset
    pub hourly: [usize; 24],
    /// Events whose timestamp could not be read
    pub unparsed: usize,
}

impl HourlyActivity {
    fn record(&mut self, timestamp: &str) {
        match event_hour(timestamp) {
            Some(hour) => self.hourly[hour as usize] += 1,
            None => self.unparsed += 1,
        }
    }
}

/// Hour of day of an upstream timestamp: RFC 3339, `+0000`-style offsets
/// as the host-IDS writes them, or offset-less database datetimes.
fn event_hour(timestamp: &str) -> Option<u32> {
    let timestamp = timestamp.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.with_timezone(&Utc).hour());
    }
    if let Ok(parsed) = DateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc).hour());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
        .map(|naive| naive.hour())
}

/// Counters over one aggregation
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub counts: BTreeMap<&'static str, usize>,
    pub severity: BTreeMap<Severity, usize>,
    pub critical: usize,
    pub total_count: usize,
    pub timestamp: String,
    pub degraded: Vec<DegradedSource>,
    /// Hourly histogram per source, keyed like `counts`
    pub activity: BTreeMap<&'static str, HourlyActivity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DegradedSource {
    pub source: SourceKind,
    pub reason: String,
}

pub struct Aggregator {
    host_ids: Arc<dyn SourceAdapter>,
    network_ids: Arc<dyn SourceAdapter>,
    correlation: Arc<dyn SourceAdapter>,
    max_limit: usize,
}

impl Aggregator {
    pub fn new(
        host_ids: Arc<dyn SourceAdapter>,
        network_ids: Arc<dyn SourceAdapter>,
        correlation: Arc<dyn SourceAdapter>,
    ) -> Self {
        Self {
            host_ids,
            network_ids,
            correlation,
            max_limit: HARD_LIMIT_CEILING,
        }
    }

    /// Lower the per-source ceiling; values above the hard ceiling are ignored
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit.clamp(1, HARD_LIMIT_CEILING);
        self
    }

    /// Wire the HTTP feeds described by the configuration
    pub fn from_config(config: &Config) -> SiemResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("siem-log-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SiemError::configuration_with_source("Failed to build HTTP client", e.into()))?;

        let sources = &config.sources;
        let endpoint_url = |name: &str, endpoint: &crate::config::SourceEndpoint| {
            endpoint.parsed_url().map_err(|e| {
                SiemError::configuration_with_source(format!("Invalid {} endpoint", name), e)
            })
        };

        let host_feed = HttpFeed::new(
            client.clone(),
            endpoint_url("host-IDS", &sources.host_ids)?,
            sources.host_ids.timeout(),
        );
        let network_feed = HttpFeed::new(
            client.clone(),
            endpoint_url("network-IDS", &sources.network_ids)?,
            sources.network_ids.timeout(),
        )
        .with_limit_param();
        let correlation_feed = HttpFeed::new(
            client,
            endpoint_url("correlation", &sources.correlation)?,
            sources.correlation.timeout(),
        )
        .with_limit_param();

        Ok(Self::new(
            Arc::new(HostIdsAdapter::new(
                Arc::new(host_feed),
                sources.host_ids.timeout(),
            )),
            Arc::new(NetworkIdsAdapter::new(
                Arc::new(network_feed),
                sources.network_ids.timeout(),
            )),
            Arc::new(CorrelationAdapter::new(
                Arc::new(correlation_feed),
                sources.correlation.timeout(),
            )),
        )
        .with_max_limit(config.limits.max_limit))
    }

    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    pub fn clamp_limit(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_limit)
    }

    pub async fn aggregate(&self, request: AggregateRequest) -> SiemResult<AggregatedLogs> {
        let limit = self.clamp_limit(request.limit);
        debug!(limit, filter = ?request.filter, "Starting aggregation");

        let host = self.spawn(&self.host_ids, request.filter, limit);
        let network = self.spawn(&self.network_ids, request.filter, limit);
        let correlation = self.spawn(&self.correlation, request.filter, limit);

        let (host, network, correlation) = tokio::join!(
            settle(SourceKind::HostIds, host),
            settle(SourceKind::NetworkIds, network),
            settle(SourceKind::Correlation, correlation),
        );

        let mut reports = Vec::with_capacity(3);
        let mut collect = |kind: SourceKind, outcome: Option<AdapterOutcome>| {
            let Some(outcome) = outcome else {
                return Vec::new();
            };
            let degraded = outcome.degraded().cloned();
            let mut events = outcome.into_events();
            events.truncate(limit);
            reports.push(SourceReport {
                source: kind,
                count: events.len(),
                degraded,
            });
            events
        };

        let host_ids = collect(SourceKind::HostIds, host?);
        let network_ids = collect(SourceKind::NetworkIds, network?);
        let correlation = collect(SourceKind::Correlation, correlation?);
        let total_count = host_ids.len() + network_ids.len() + correlation.len();

        info!(
            host_ids = host_ids.len(),
            network_ids = network_ids.len(),
            correlation = correlation.len(),
            total_count,
            limit,
            "Aggregated logs"
        );

        Ok(AggregatedLogs {
            host_ids,
            network_ids,
            correlation,
            total_count,
            timestamp: Utc::now(),
            reports,
        })
    }

    fn spawn(
        &self,
        adapter: &Arc<dyn SourceAdapter>,
        filter: SourceFilter,
        limit: usize,
    ) -> Option<JoinHandle<AdapterOutcome>> {
        if !filter.includes(adapter.kind()) {
            return None;
        }
        let adapter = Arc::clone(adapter);
        Some(tokio::spawn(async move { adapter.fetch(limit).await }))
    }
}

/// Wait for an adapter task; a panicked task is an internal fault
async fn settle(
    kind: SourceKind,
    handle: Option<JoinHandle<AdapterOutcome>>,
) -> SiemResult<Option<AdapterOutcome>> {
    match handle {
        None => Ok(None),
        Some(handle) => handle.await.map(Some).map_err(|e| {
            SiemError::internal_with_source(format!("{} adapter task failed", kind), e.into())
        }),
    }
}
