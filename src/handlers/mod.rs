//! Handlers module for the aggregator HTTP API
//!
//! This module contains the HTTP request handlers and the router that
//! mounts them, organized by functionality.

pub mod health;
pub mod logs;

use crate::aggregator::Aggregator;
use crate::config::Config;
use axum::{
    http::{header, Method},
    handler::Handler,
    routing::{get, MethodRouter},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

// Re-export commonly used types
pub use health::HealthResponse;
pub use logs::{LogsQuery, LogsResponse};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<Aggregator>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, aggregator: Arc<Aggregator>) -> Self {
        Self {
            config,
            aggregator,
            start_time: Instant::now(),
        }
    }

    /// Whether 500 envelopes may carry diagnostic text
    pub fn expose_details(&self) -> bool {
        self.config.environment.is_development()
    }
}

/// GET route whose other methods, HEAD included, get the JSON 405 envelope.
/// An explicit HEAD handler is needed because axum serves HEAD from GET.
fn get_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    get(handler)
        .head(logs::method_not_allowed)
        .fallback(logs::method_not_allowed)
}

/// Create the application router with its middleware stack
pub fn create_router(state: AppState) -> Router {
    let logs_route = get_only(logs::get_logs).options(logs::preflight);

    let router = Router::new()
        .route("/health", get_only(health::health_check))
        .route("/api/logs", logs_route.clone())
        .route("/api/logs.php", logs_route)
        .route("/api/logs/summary", get_only(logs::get_summary))
        .with_state(state.clone());

    let router = if state.config.server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
    } else {
        router
    };

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(state.config.request_timeout())),
    )
}
