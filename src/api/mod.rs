//! API Module
//!
//! Axum glue for the response cache: the caching middleware, and the demo
//! server's handlers and routes.
//!
//! # Endpoints
//! - `GET /slow/json` - Cached slow JSON render
//! - `GET /slow/html` - Cached slow HTML render
//! - `GET /stats` - Get cache statistics
//! - `DELETE /cache` - Clear the cache
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{
    authorization_header, cache_responses, AuthExtractor, CachePredicate, CachedResponse,
    ResponseCache, CACHE_STATUS, DEFAULT_MAX_BODY_BYTES,
};
pub use routes::create_router;
