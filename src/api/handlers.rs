//! API Handlers
//!
//! Request handlers for the demo server: two deliberately slow renders that
//! sit behind the response cache, plus admin endpoints.

use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    Extension, Json,
};
use serde_json::{json, Value};

use super::middleware::CachedResponse;
use crate::cache::CacheEngine;
use crate::config::Config;
use crate::error::Result;
use crate::models::{ClearResponse, HealthResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Engine backing the cached routes
    pub engine: CacheEngine,
    /// Simulated cost of rendering one page
    pub render_delay: Duration,
}

impl AppState {
    pub fn new(engine: CacheEngine, render_delay: Duration) -> Self {
        Self {
            engine,
            render_delay,
        }
    }

    /// Builds the engine described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = CacheEngine::new(config.cache_options()?)?;
        Ok(Self::new(
            engine,
            Duration::from_millis(config.render_delay_ms),
        ))
    }
}

/// Handler for GET /slow/json
///
/// Sleeps for the render delay, then returns a JSON report. Served from the
/// cache on repeat requests.
pub async fn slow_json_handler(State(state): State<AppState>) -> Json<Value> {
    tokio::time::sleep(state.render_delay).await;

    Json(json!({
        "report": "quarterly",
        "rendered_at": chrono::Utc::now().to_rfc3339(),
        "render_ms": state.render_delay.as_millis() as u64,
    }))
}

/// Handler for GET /slow/html
///
/// Runs behind a manual-mode cache: a cached page is returned as-is, otherwise
/// the page is rendered the slow way.
pub async fn slow_html_handler(
    State(state): State<AppState>,
    Extension(cached): Extension<CachedResponse>,
) -> impl IntoResponse {
    if let Some(page) = cached.value {
        return Html(page);
    }

    tokio::time::sleep(state.render_delay).await;
    Html(format!(
        "<!doctype html><html><body><h1>Slow page</h1><p>Rendered at {}</p></body></html>",
        chrono::Utc::now().to_rfc3339()
    ))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.engine.stats().await;
    Json(StatsResponse::new(&stats, state.engine.max_size()))
}

/// Handler for DELETE /cache
///
/// Drops every cached response.
pub async fn clear_handler(State(state): State<AppState>) -> impl IntoResponse {
    let removed = state.engine.clear().await;

    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(ClearResponse::new(removed)),
    )
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;

    fn test_state() -> AppState {
        let engine = CacheEngine::new(CacheOptions::new().with_max_size(4)).unwrap();
        AppState::new(engine, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_slow_json_handler() {
        let response = slow_json_handler(State(test_state())).await;
        assert_eq!(response["report"], "quarterly");
        assert_eq!(response["render_ms"], 1);
    }

    #[tokio::test]
    async fn test_slow_html_handler_reuses_cached_page() {
        let cached = CachedResponse {
            is_cached: true,
            value: Some("<p>cached</p>".to_string()),
        };
        let response = slow_html_handler(State(test_state()), Extension(cached))
            .await
            .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<p>cached</p>");
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        state.engine.put("/a", None, "a").await.unwrap();
        state.engine.get("/a", None).await.unwrap();
        state.engine.get("/b", None).await.unwrap();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 1);
        assert_eq!(response.misses, 1);
        assert_eq!(response.total_entries, 1);
        assert_eq!(response.max_size, 4);
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state();
        state.engine.put("/a", None, "a").await.unwrap();
        state.engine.put("/b", None, "b").await.unwrap();

        clear_handler(State(state.clone())).await;
        assert_eq!(state.engine.size().await, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_state_from_config_rejects_bad_sizes() {
        let config = Config {
            max_size: 2,
            min_size: 2,
            ..Config::default()
        };
        assert!(AppState::from_config(&config).is_err());
    }
}
