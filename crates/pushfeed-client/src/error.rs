//! Error types for feed client operations
//!
//! These cover setting the client up. Failures on the stream itself are never
//! returned from a call; they are published as [`ErrorEvent`](pushfeed_core::ErrorEvent)s.

use thiserror::Error;

/// Result type alias for feed client operations
pub type Result<T> = std::result::Result<T, FeedClientError>;

/// Errors that can occur while building or starting a client
#[derive(Error, Debug)]
pub enum FeedClientError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// URL scheme other than http/https
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Header name or value rejected
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// `connect()` called on a client that already ran (or was disconnected)
    #[error("Client already started; create a new client to reconnect")]
    AlreadyStarted,

    /// No tokio runtime to spawn the read loop on
    #[error("No tokio runtime available")]
    NoRuntime,
}
