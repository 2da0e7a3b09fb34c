//! Error types surfaced by the feed

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NotificationType;

/// Reasons a received record could not be turned into an [`EventData`](crate::EventData)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Outer envelope is not valid JSON or lacks the payload field
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Payload is neither an object nor a string holding one
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Payload object has no usable `type` field
    #[error("Payload has no type discriminator")]
    MissingType,

    /// Discriminator is not one of the known notification types
    #[error("Unexpected notification type: {0}")]
    UnknownType(String),

    /// Discriminator is known but the variant fields do not match
    #[error("Invalid {ty} payload: {message}")]
    InvalidFields {
        ty: NotificationType,
        message: String,
    },

    /// Record bytes are not UTF-8
    #[error("Record is not valid UTF-8")]
    InvalidUtf8,

    /// Record grew past the framing limit before its terminator arrived
    #[error("Record exceeds {limit} bytes")]
    RecordTooLarge { limit: usize },
}

/// Which stage of the feed produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The connection attempt failed
    Connect,
    /// An established stream failed
    Read,
    /// A record could not be decoded; the stream stays up
    Decode,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Connect => "connect",
            ErrorKind::Read => "read",
            ErrorKind::Decode => "decode",
        }
    }

    /// Whether this kind ends the read loop
    pub fn is_terminal(self) -> bool {
        !matches!(self, ErrorKind::Decode)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorEvent {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connect, message)
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Read, message)
    }
}

impl From<DecodeError> for ErrorEvent {
    fn from(err: DecodeError) -> Self {
        Self::new(ErrorKind::Decode, err.to_string())
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}
