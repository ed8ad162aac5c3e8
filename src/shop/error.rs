//! Error types for shop backend calls.

use thiserror::Error;

/// Failure of a single request to the shop backend.
///
/// Every variant is terminal for the request that produced it; the widget
/// turns it into a chat message and never retries.
#[derive(Error, Debug)]
pub enum ShopError {
    /// Transport failure or unreadable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Body was not the JSON we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that matches none of the known reply shapes.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Result type alias for shop operations.
pub type Result<T> = std::result::Result<T, ShopError>;
