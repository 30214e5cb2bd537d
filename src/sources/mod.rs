//! Upstream IDS feeds and the adapters that normalize them
//!
//! A `Feed` is the transport: fetch the latest records from one endpoint as
//! text. A `SourceAdapter` owns a feed, parses what it returns and maps it
//! into `NormalizedEvent`s. Adapters never fail: any transport or payload
//! problem becomes `AdapterOutcome::Degraded`, so one dead upstream cannot
//! break the whole response.

pub mod correlation;
pub mod fields;
pub mod host_ids;
pub mod network_ids;
mod passthrough;

pub use correlation::CorrelationAdapter;
pub use host_ids::HostIdsAdapter;
pub use network_ids::NetworkIdsAdapter;

use crate::event::{NormalizedEvent, SourceKind};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Transport-level failure talking to an upstream feed
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned HTTP {0}")]
    Status(u16),
}

/// Fetch contract shared by the real HTTP client and test fakes
#[async_trait]
pub trait Feed: Send + Sync {
    /// Return the raw payload holding (at least) the latest `limit` records
    async fn fetch(&self, limit: usize) -> Result<String, FeedError>;
}

/// `Feed` over HTTP GET
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
    send_limit: bool,
}

impl HttpFeed {
    pub fn new(client: reqwest::Client, url: Url, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
            send_limit: false,
        }
    }

    /// Append `?limit=N` to every request
    pub fn with_limit_param(mut self) -> Self {
        self.send_limit = true;
        self
    }
}

#[async_trait]
impl Feed for HttpFeed {
    async fn fetch(&self, limit: usize) -> Result<String, FeedError> {
        let mut request = self.client.get(self.url.clone()).timeout(self.timeout);
        if self.send_limit {
            request = request.query(&[("limit", limit)]);
        }

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FeedError::Timeout(self.timeout)
            } else {
                FeedError::Request(e)
            }
        };

        let response = request.send().await.map_err(&classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(&classify)?;
        debug!(url = %self.url, bytes = body.len(), "Fetched upstream payload");
        Ok(body)
    }
}

/// Why an adapter returned nothing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DegradedReason {
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    #[error("upstream timed out after {0:?}")]
    TimedOut(Duration),

    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<FeedError> for DegradedReason {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Request(e) => DegradedReason::Unreachable(e.to_string()),
            FeedError::Timeout(after) => DegradedReason::TimedOut(after),
            FeedError::Status(code) => DegradedReason::UpstreamStatus(code),
        }
    }
}

/// Result of one adapter invocation
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    Ok(Vec<NormalizedEvent>),
    Degraded { reason: DegradedReason },
}

impl AdapterOutcome {
    pub fn degraded(&self) -> Option<&DegradedReason> {
        match self {
            AdapterOutcome::Ok(_) => None,
            AdapterOutcome::Degraded { reason } => Some(reason),
        }
    }

    /// Degraded outcomes contribute no events
    pub fn into_events(self) -> Vec<NormalizedEvent> {
        match self {
            AdapterOutcome::Ok(events) => events,
            AdapterOutcome::Degraded { .. } => Vec::new(),
        }
    }
}

/// One upstream source, normalized
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Latest `limit` events, newest first
    async fn fetch(&self, limit: usize) -> AdapterOutcome;
}

/// Run a feed fetch inside the source's own time budget.
pub(crate) async fn fetch_within(
    feed: &dyn Feed,
    limit: usize,
    budget: Duration,
) -> Result<String, DegradedReason> {
    match tokio::time::timeout(budget, feed.fetch(limit)).await {
        Ok(result) => result.map_err(DegradedReason::from),
        Err(_) => Err(DegradedReason::TimedOut(budget)),
    }
}

/// Log and wrap a degraded result
pub(crate) fn degrade(source: SourceKind, reason: DegradedReason) -> AdapterOutcome {
    warn!(source = %source, reason = %reason, "Source degraded, returning no events");
    AdapterOutcome::Degraded { reason }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process feeds for adapter and aggregator tests

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves a fixed body and records the limits it was asked for
    pub struct StaticFeed {
        body: String,
        call_count: AtomicUsize,
        requested_limit: AtomicUsize,
    }

    impl StaticFeed {
        pub fn new(body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                body: body.into(),
                call_count: AtomicUsize::new(0),
                requested_limit: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn last_limit(&self) -> usize {
            self.requested_limit.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Feed for StaticFeed {
        async fn fetch(&self, limit: usize) -> Result<String, FeedError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.requested_limit.store(limit, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    /// Always fails with an upstream status
    pub struct FailingFeed(pub u16);

    #[async_trait]
    impl Feed for FailingFeed {
        async fn fetch(&self, _limit: usize) -> Result<String, FeedError> {
            Err(FeedError::Status(self.0))
        }
    }

    /// Never answers within any reasonable budget
    pub struct StalledFeed;

    #[async_trait]
    impl Feed for StalledFeed {
        async fn fetch(&self, _limit: usize) -> Result<String, FeedError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_fetch_within_enforces_budget() {
        let started = std::time::Instant::now();
        let result = fetch_within(&StalledFeed, 10, Duration::from_millis(50)).await;
        assert_eq!(result, Err(DegradedReason::TimedOut(Duration::from_millis(50))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_feed_errors_map_to_reasons() {
        let result = fetch_within(&FailingFeed(502), 10, Duration::from_secs(1)).await;
        assert_eq!(result, Err(DegradedReason::UpstreamStatus(502)));
    }

    #[test]
    fn test_degraded_outcome_is_empty() {
        let outcome = AdapterOutcome::Degraded {
            reason: DegradedReason::MalformedPayload("not json".to_string()),
        };
        assert!(outcome.degraded().is_some());
        assert!(outcome.into_events().is_empty());
    }
}
