//! SIEM Log Aggregator Library
//!
//! Polls the host-IDS, network-IDS and correlation feeds, normalizes their
//! records into one event schema and serves the merged, bounded result to
//! the dashboard.
//!
//! # Modules
//!
//! - `classify`: Severity tiers and keyword event-type heuristic
//! - `event`: The normalized event and its per-source wire shapes
//! - `sources`: Upstream feeds and the adapters that normalize them
//! - `aggregator`: Concurrent fan-out over the adapters
//! - `handlers`: Axum router and request handlers
//! - `config`: Service configuration
//! - `error_handling`: Service error type and JSON error envelope

pub mod aggregator;
pub mod classify;
pub mod config;
pub mod error_handling;
pub mod event;
pub mod handlers;
pub mod sources;

// Re-export the main types for convenience
pub use aggregator::{AggregateRequest, AggregatedLogs, Aggregator, LogSummary, SourceFilter};
pub use classify::{classify_event_type, classify_severity, EventType, Severity};
pub use config::Config;
pub use error_handling::{ApiError, ErrorResponse, SiemError, SiemResult};
pub use event::{NormalizedEvent, SourceKind};
pub use handlers::{create_router, AppState};
pub use sources::{AdapterOutcome, DegradedReason, Feed, SourceAdapter};
