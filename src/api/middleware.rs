//! Response Caching Middleware
//!
//! Wraps axum routes so that successful GET responses are served from a
//! [`CacheEngine`] on repeat requests.
//!
//! The cache key is the request path plus query string as the client sent it,
//! so routers nested under different prefixes never share entries. Keys are
//! partitioned by an optional auth token pulled from the request headers.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::cache::{CacheEngine, ContentKind};
use crate::error::CacheError;

/// Header telling clients whether the body came from the cache
pub const CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache");

/// Largest body buffered for caching by default: 1 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

pub type AuthExtractor = Arc<dyn Fn(&HeaderMap) -> Option<String> + Send + Sync>;
pub type CachePredicate = Arc<dyn Fn(&Method, StatusCode) -> bool + Send + Sync>;

/// Lookup result handed to handlers of a cache running in manual mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub is_cached: bool,
    pub value: Option<String>,
}

// == Response Cache ==
/// Per-route caching context passed to [`cache_responses`] as state.
#[derive(Clone)]
pub struct ResponseCache {
    engine: CacheEngine,
    auth: Option<AuthExtractor>,
    should_cache: CachePredicate,
    manual_response: bool,
    kind: ContentKind,
    max_body_bytes: usize,
}

impl ResponseCache {
    /// Caches successful responses, unpartitioned, as the engine's content kind.
    pub fn new(engine: CacheEngine) -> Self {
        let kind = engine.content_kind();
        Self {
            engine,
            auth: None,
            should_cache: Arc::new(|_, status| status.is_success()),
            manual_response: false,
            kind,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Partitions entries by the token `extract` pulls from the headers.
    pub fn with_auth(
        mut self,
        extract: impl Fn(&HeaderMap) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.auth = Some(Arc::new(extract));
        self
    }

    pub fn with_should_cache(
        mut self,
        predicate: impl Fn(&Method, StatusCode) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_cache = Arc::new(predicate);
        self
    }

    /// Always runs the handler, handing it a [`CachedResponse`] extension
    /// instead of answering hits directly.
    pub fn manual(mut self) -> Self {
        self.manual_response = true;
        self
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Responses larger than `limit`, or of unknown length, are passed
    /// through uncached.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn engine(&self) -> &CacheEngine {
        &self.engine
    }

    fn auth_token(&self, headers: &HeaderMap) -> Option<String> {
        self.auth.as_ref().and_then(|extract| extract(headers))
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("engine", &self.engine)
            .field("partitioned", &self.auth.is_some())
            .field("manual_response", &self.manual_response)
            .field("kind", &self.kind)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Reads the raw `Authorization` header as the partition token.
pub fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

// == Middleware ==
/// Serves cached bodies on hit and stores fresh ones on miss.
///
/// Only GET requests are looked up. Backend errors while storing are logged
/// and never fail the response that was already produced.
pub async fn cache_responses(
    State(cache): State<ResponseCache>,
    mut req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let path = request_path(&req);
    let auth = cache.auth_token(req.headers());

    let cached = match cache.engine.get(&path, auth.as_deref()).await {
        Ok(value) => value,
        Err(e) => return e.into_response(),
    };

    if cache.manual_response {
        let is_cached = cached.is_some();
        req.extensions_mut().insert(CachedResponse {
            is_cached,
            value: cached,
        });
        if is_cached {
            return with_status(next.run(req).await, "HIT");
        }
    } else if let Some(body) = cached {
        let response = (
            [(header::CONTENT_TYPE, cache.kind.content_type())],
            body,
        )
            .into_response();
        return with_status(response, "HIT");
    }

    let method = req.method().clone();
    let response = next.run(req).await;
    if !(cache.should_cache)(&method, response.status()) {
        return with_status(response, "MISS");
    }

    let limit = cache.max_body_bytes;
    let fits = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64);
    if !fits {
        debug!(path = %path, limit, "Response body too large or unbounded, not caching");
        return with_status(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => return CacheError::Io(std::io::Error::other(e)).into_response(),
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            if let Err(e) = cache
                .engine
                .put_as(&path, auth.as_deref(), text, cache.kind)
                .await
            {
                warn!(path = %path, error = %e, "Failed to cache response");
            }
        }
        Err(_) => debug!(path = %path, "Skipping non UTF-8 response body"),
    }

    with_status(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

/// Path and query of the request as the client sent it.
///
/// Nested routers see a URI with their mount prefix stripped; axum keeps the
/// full one in the `OriginalUri` extension.
fn request_path(req: &Request) -> String {
    let uri: &Uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or_else(|| req.uri());
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn with_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS, HeaderValue::from_static(status));
    response
}
