//! Network-IDS adapter
//!
//! The network sensor's log service answers `GET <url>?limit=N` with a JSON
//! array of alert objects, newest first.

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

pub struct NetworkIdsAdapter {
    feed: Arc<dyn Feed>,
    budget: Duration,
}

impl NetworkIdsAdapter {
    pub fn new(feed: Arc<dyn Feed>, budget: Duration) -> Self {
        Self { feed, budget }
    }
}

#[async_trait]
impl SourceAdapter for NetworkIdsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::NetworkIds
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
                .map(|record| normalize_alert(record, &fetched_at))
                .collect(),
        )
    }
}

pub fn normalize_alert(record: Value, fetched_at: &str) -> NormalizedEvent {
    let description = fields::resolve_or(&record, &DESCRIPTION_KEYS, NO_DESCRIPTION);
    passthrough::normalize_record(
        record,
        SourceKind::NetworkIds,
        EventType::NetworkIds.label(),
        description,
        fetched_at,
    )
}
