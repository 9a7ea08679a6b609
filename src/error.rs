//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its HTTP glue.
///
/// A lookup that finds nothing is not an error; it is reported as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Options rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Duration string could not be parsed
    #[error("Invalid duration string '{0}'")]
    InvalidDuration(String),

    /// Storage backend I/O failure
    #[error("Backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Discard strategy picked a position outside the index
    #[error("Discard strategy chose position {index} but only {len} entries exist")]
    InvalidVictim { index: usize, len: usize },
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidConfig(_) | CacheError::InvalidDuration(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Io(_) | CacheError::InvalidVictim { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
