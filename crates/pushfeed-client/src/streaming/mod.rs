//! Streaming support for the notification feed
//!
//! [`SseParser`] frames raw bytes into records and [`StreamReader`] drives the
//! parser, the decoder and the dispatcher over one open response body.

mod parser;
mod reader;

pub use parser::{SseParser, SseRecord, MAX_RECORD_BYTES};
pub use reader::{ReadOutcome, StreamReader};

pub(crate) use reader::stop_requested;
