//! Connection lifecycle state

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Lifecycle of one connection attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Initial,
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Initial => "initial",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Status cell shared between the caller and the read loop
///
/// Any transition is accepted; ordering is up to the writer.
#[derive(Debug, Default)]
pub struct StatusStore {
    status: Mutex<Status>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Status {
        *self.status.lock()
    }

    pub fn set(&self, status: Status) {
        *self.status.lock() = status;
    }

    /// Store `status` and return the value it replaced
    pub fn replace(&self, status: Status) -> Status {
        std::mem::replace(&mut *self.status.lock(), status)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_starts_initial() {
        assert_eq!(StatusStore::new().get(), Status::Initial);
    }

    #[test]
    fn test_any_transition_is_accepted() {
        let store = StatusStore::new();
        store.set(Status::Disconnected);
        store.set(Status::Connecting);
        assert_eq!(store.replace(Status::Connected), Status::Connecting);
        assert_eq!(store.get(), Status::Connected);
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let store = Arc::new(StatusStore::new());
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    store.set(Status::Connecting);
                    store.set(Status::Connected);
                }
            })
        };

        for _ in 0..1000 {
            assert_ne!(store.get(), Status::Disconnected);
        }
        writer.join().unwrap();
        assert_eq!(store.get(), Status::Connected);
    }
}
