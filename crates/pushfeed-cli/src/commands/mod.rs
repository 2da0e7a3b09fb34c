//! Command implementations for pushfeed

pub mod decode;
pub mod watch;

pub use decode::decode;
pub use watch::watch;
