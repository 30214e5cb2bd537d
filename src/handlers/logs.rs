//! Logs endpoint
//!
//! Serves the aggregated feeds in the shape the dashboard has always
//! consumed: one list per source under its historical key, plus the total
//! count and the aggregation time. Query parameters are coerced, never
//! rejected.

use super::AppState;
use crate::aggregator::{AggregateRequest, AggregatedLogs, LogSummary, SourceFilter};
use crate::error_handling::{ApiError, ErrorContext, SiemError};
use crate::event::{NormalizedEvent, SourceKind};
use axum::{
    extract::{RawQuery, State},
    http::{Method, StatusCode},
    response::Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Parameters of a logs request after lenient parsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsQuery {
    /// `None` when absent or without a leading integer
    pub limit: Option<i64>,
    pub filter: SourceFilter,
}

impl LogsQuery {
    /// Parse a raw query string; the last occurrence of a key wins
    pub fn from_raw(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        let raw = raw.unwrap_or_default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match &*key {
                "limit" => query.limit = parse_leading_int(&value),
                "type" => query.filter = SourceFilter::parse_lenient(Some(&*value)),
                _ => {}
            }
        }
        query
    }

    /// Zero and negative limits become 1; the aggregator applies the ceiling
    pub fn to_request(&self, default_limit: usize) -> AggregateRequest {
        let limit = match self.limit {
            Some(n) => usize::try_from(n.max(1)).unwrap_or(usize::MAX),
            None => default_limit,
        };
        AggregateRequest {
            limit,
            filter: self.filter,
        }
    }
}

/// Leading integer of a parameter, saturating at the `i64` bounds.
/// `5.5` reads as 5 and `10abc` as 10; text without leading digits is `None`.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let digits = &rest[..rest.bytes().take_while(u8::is_ascii_digit).count()];
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.bytes().fold(0i64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// Response body of `GET /api/logs`
#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub wazuh_logs: Vec<Value>,
    pub snort_logs: Vec<Value>,
    pub correlation_logs: Vec<Value>,
    pub total_count: usize,
    pub timestamp: String,
}

impl LogsResponse {
    pub fn from_aggregate(logs: &AggregatedLogs) -> serde_json::Result<Self> {
        let wire = |kind: SourceKind| {
            logs.events(kind)
                .iter()
                .map(NormalizedEvent::to_wire)
                .collect::<serde_json::Result<Vec<_>>>()
        };

        Ok(Self {
            wazuh_logs: wire(SourceKind::HostIds)?,
            snort_logs: wire(SourceKind::NetworkIds)?,
            correlation_logs: wire(SourceKind::Correlation)?,
            total_count: logs.total_count,
            timestamp: logs.timestamp_rfc3339(),
        })
    }
}

async fn run_aggregation(state: &AppState, raw: Option<&str>) -> Result<AggregatedLogs, ApiError> {
    let query = LogsQuery::from_raw(raw);
    debug!(?query, "Logs request");
    let request = query.to_request(state.config.limits.default_limit);
    state
        .aggregator
        .aggregate(request)
        .await
        .map_err(|e| ApiError::new(e, state.expose_details()))
}

/// `GET /api/logs?type=&limit=`
pub async fn get_logs(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<LogsResponse>, ApiError> {
    let logs = run_aggregation(&state, raw.as_deref()).await?;
    let response = LogsResponse::from_aggregate(&logs)
        .with_context(|| "Failed to serialize logs response".to_string())
        .map_err(|e| ApiError::new(e, state.expose_details()))?;
    Ok(Json(response))
}

/// `GET /api/logs/summary?type=&limit=`
pub async fn get_summary(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<LogSummary>, ApiError> {
    let logs = run_aggregation(&state, raw.as_deref()).await?;
    Ok(Json(logs.summary()))
}

/// CORS preflight without CORS headers still gets an empty 200
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::new(SiemError::method_not_allowed(method.as_str()), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = LogsQuery::from_raw(None);
        assert_eq!(query, LogsQuery::default());
        let request = query.to_request(100);
        assert_eq!(request.limit, 100);
        assert_eq!(request.filter, SourceFilter::All);
    }

    #[test]
    fn test_query_parsing_is_lenient() {
        let query = LogsQuery::from_raw(Some("limit=abc&type=nonsense"));
        assert_eq!(query.to_request(100).limit, 100);
        assert_eq!(query.filter, SourceFilter::All);

        let query = LogsQuery::from_raw(Some("limit=-7&type=snort"));
        assert_eq!(query.to_request(100).limit, 1);
        assert_eq!(query.filter, SourceFilter::Only(SourceKind::NetworkIds));

        let query = LogsQuery::from_raw(Some("type=host-ids&limit=+25&limit=%2050"));
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.filter, SourceFilter::Only(SourceKind::HostIds));
    }

    #[test]
    fn test_limit_reads_leading_integer() {
        assert_eq!(LogsQuery::from_raw(Some("limit=5.5")).limit, Some(5));
        assert_eq!(LogsQuery::from_raw(Some("limit=10abc")).limit, Some(10));
        assert_eq!(LogsQuery::from_raw(Some("limit=-")).limit, None);
        assert_eq!(LogsQuery::from_raw(Some("limit=.5")).limit, None);
        assert_eq!(LogsQuery::from_raw(Some("limit=")).limit, None);
    }

    #[test]
    fn test_oversized_limit_saturates() {
        let query = LogsQuery::from_raw(Some("limit=99999999999999999999"));
        assert_eq!(query.limit, Some(i64::MAX));
        assert!(query.to_request(100).limit >= 1000);

        let query = LogsQuery::from_raw(Some("limit=-99999999999999999999"));
        assert_eq!(query.limit, Some(-i64::MAX));
        assert_eq!(query.to_request(100).limit, 1);
    }

    #[test]
    fn test_large_limit_passes_through_for_clamping() {
        let query = LogsQuery::from_raw(Some("limit=5000"));
        assert_eq!(query.to_request(100).limit, 5000);
    }
}
