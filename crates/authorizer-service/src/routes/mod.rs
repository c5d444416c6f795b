//! HTTP routes for the authorizer service.
//!
//! Defines the Axum router and application state.

use crate::auth::Authorizer;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_authorization};
use crate::services::{CounterStore, RoleManager};
use axum::{
    http::Method,
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authorization orchestrator (shared key cache).
    pub authorizer: Arc<Authorizer>,

    /// Like counter.
    pub counter_store: Arc<dyn CounterStore>,

    /// Member role manager; `None` when management credentials are not configured.
    pub role_manager: Option<Arc<dyn RoleManager>>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/authorize` - token authorizer invocation - public
/// - `/v1/health` - key cache health - public
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/v1/like` - counter read/increment/decrement - authorized
/// - `/v1/rank/:id` - member role grant/revoke - authorized
/// - CORS on the authorized routes, including their 403/503 responses
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/v1/authorize", post(handlers::authorize))
        .route("/v1/health", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Guarded by the same authorizer the gateway would invoke
    let protected_routes = Router::new()
        .route(
            "/v1/like",
            get(handlers::read_like)
                .put(handlers::increment_like)
                .delete(handlers::decrement_like),
        )
        .route(
            "/v1/rank/:id",
            put(handlers::rank_up).delete(handlers::rank_down),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_authorization,
        ))
        .layer(browser_cors())
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Browser clients call the guarded routes from any origin.
///
/// Sits outside the route guard so preflights are answered without a token
/// and rejections still carry the headers.
fn browser_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
