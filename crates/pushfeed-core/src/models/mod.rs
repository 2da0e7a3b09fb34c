//! Data models for feed notifications

mod envelope;
mod event;

pub use envelope::Envelope;
pub use event::*;
