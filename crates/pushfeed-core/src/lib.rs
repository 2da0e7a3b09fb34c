//! pushfeed-core - Notification types and protocol logic for the push feed
//!
//! This crate holds everything about the feed that does not touch the network:
//! the typed notification model, the envelope decoder, the subscriber
//! dispatcher and the connection status cell. `pushfeed-client` drives these
//! from a streaming HTTP connection.

pub mod decode;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod status;

pub use decode::{decode, decode_payload};
pub use dispatch::{EventDispatcher, SubscriberId};
pub use error::{DecodeError, ErrorEvent, ErrorKind};
pub use models::*;
pub use status::{Status, StatusStore};
