//! Error types for the depth-sync crate.
//!
//! This module defines the errors that can occur while talking to the
//! exchange (snapshot fetches, the depth stream) and while decoding its
//! messages. Sequence gaps are not represented here: a gap is handled by
//! resynchronizing the book, never reported to callers.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (listener bind, socket setup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration (missing fields, bad format)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exchange returned an error response
    #[error("API error ({}): {}", .0.status, .0.message)]
    Api(ApiError),

    /// Rate limit exceeded
    #[error("Rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited {
        /// Retry after this many seconds (from the `Retry-After` header)
        retry_after_secs: Option<u64>,
    },

    /// WebSocket connection closed unexpectedly
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// A price level could not be parsed
    #[error("Malformed price level [{price:?}, {quantity:?}]: {reason}")]
    MalformedLevel {
        /// Price text as received
        price: String,
        /// Quantity text as received
        quantity: String,
        /// What was wrong with it
        reason: &'static str,
    },

    /// A depth update is internally inconsistent
    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
}

/// Error returned by the exchange REST API
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Exchange error code (if provided)
    pub code: Option<i64>,
    /// Error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Create an API error with an exchange error code
    pub fn with_code(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code),
            message: message.into(),
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(", retry after {}s", secs),
        None => String::new(),
    }
}

impl From<tokio_tungstenite::tungstenite::http::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::http::Error) -> Self {
        Error::Config(format!("HTTP error building WebSocket request: {}", err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("invalid URL: {}", err))
    }
}
