//! pushfeed client library
//!
//! Holds a long-lived SSE connection to a push-notification feed, decodes each
//! record into a typed [`EventData`] and hands it to registered callbacks.
//!
//! # Example
//!
//! ```rust,no_run
//! use pushfeed_client::{EventData, EventSourceClient, EventSourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EventSourceConfig::new("https://streaming.example.com/sse")
//!         .read_timeout_ms(70_000)
//!         .bearer_token("token");
//!     let client = EventSourceClient::new(config)?;
//!
//!     client.on_event(|event| match event {
//!         EventData::SplitUpdate(update) => println!("refresh at {}", update.change_number),
//!         other => println!("{other}"),
//!     });
//!     client.on_error(|error| eprintln!("{error}"));
//!
//!     client.connect()?;
//!     client.closed().await;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a scripted feed endpoint:
//!
//! ```rust,ignore
//! use pushfeed_client::testing::FeedServer;
//!
//! let server = FeedServer::start().await?;
//! let client = EventSourceClient::spawn(EventSourceConfig::new(server.url()))?;
//! server.send_notification(&json!({"type": "SPLIT_UPDATE", "changeNumber": 1}));
//! ```

mod client;
mod config;
mod error;
pub mod streaming;
pub mod testing;

pub use client::EventSourceClient;
pub use config::EventSourceConfig;
pub use error::{FeedClientError, Result};

// Re-export core types for convenience
pub use pushfeed_core::{
    ControlType, DecodeError, ErrorEvent, ErrorKind, EventData, NotificationType, Status,
    SubscriberId,
};
