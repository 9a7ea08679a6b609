//! API Routes
//!
//! Configures the Axum router for the demo server.

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, slow_html_handler, slow_json_handler, stats_handler, AppState,
};
use super::middleware::{authorization_header, cache_responses, ResponseCache};
use crate::cache::ContentKind;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /slow/json` - Slow JSON render, cached per `Authorization` header
/// - `GET /slow/html` - Slow HTML render, cached in manual mode
/// - `GET /stats` - Cache statistics
/// - `DELETE /cache` - Drop every cached response
/// - `GET /health` - Health check endpoint
///
/// Both slow routes share the state's engine.
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let json_cache = ResponseCache::new(state.engine.clone())
        .with_kind(ContentKind::Json)
        .with_auth(authorization_header);
    let html_cache = ResponseCache::new(state.engine.clone())
        .with_kind(ContentKind::Html)
        .manual();

    Router::new()
        .route(
            "/slow/json",
            get(slow_json_handler).route_layer(from_fn_with_state(json_cache, cache_responses)),
        )
        .route(
            "/slow/html",
            get(slow_html_handler).route_layer(from_fn_with_state(html_cache, cache_responses)),
        )
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
