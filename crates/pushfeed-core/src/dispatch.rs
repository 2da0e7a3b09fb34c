//! Subscriber registry and synchronous fan-out of feed events

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::ErrorEvent;
use crate::models::EventData;

type EventHandler = Arc<dyn Fn(&EventData) + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Handle returned on registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Multicasts events and errors to registered callbacks
///
/// Callbacks run on the publishing task, in registration order. A slow
/// callback stalls the publisher. The registry is snapshotted before each
/// publish, so callbacks may (un)register others, or themselves, freely.
#[derive(Default)]
pub struct EventDispatcher {
    next_id: AtomicU64,
    event_handlers: RwLock<Vec<(SubscriberId, EventHandler)>>,
    error_handlers: RwLock<Vec<(SubscriberId, ErrorHandler)>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a callback for decoded events
    pub fn on_event<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.event_handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Register a callback for errors
    pub fn on_error<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.error_handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Remove a callback. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut removed = false;
        self.event_handlers.write().retain(|(sid, _)| {
            let keep = *sid != id;
            removed |= !keep;
            keep
        });
        self.error_handlers.write().retain(|(sid, _)| {
            let keep = *sid != id;
            removed |= !keep;
            keep
        });
        removed
    }

    /// Number of registered callbacks, events and errors combined
    pub fn subscriber_count(&self) -> usize {
        self.event_handlers.read().len() + self.error_handlers.read().len()
    }

    pub fn publish(&self, event: &EventData) {
        debug!(%event, "Dispatching event");
        let handlers: Vec<EventHandler> = self
            .event_handlers
            .read()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        trace!(subscribers = handlers.len(), "Event fan-out");
        for handler in handlers {
            handler(event);
        }
    }

    pub fn publish_error(&self, error: &ErrorEvent) {
        debug!(kind = %error.kind, message = %error.message, "Dispatching error");
        let handlers: Vec<ErrorHandler> = self
            .error_handlers
            .read()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(error);
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("event_handlers", &self.event_handlers.read().len())
            .field("error_handlers", &self.error_handlers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::error::ErrorKind;
    use crate::models::SplitUpdate;

    fn update(n: i64) -> EventData {
        EventData::SplitUpdate(SplitUpdate { change_number: n })
    }

    #[test]
    fn test_registration_order() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            dispatcher.on_event(move |_| seen.lock().push(tag));
        }

        dispatcher.publish(&update(1));
        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_errors_only_reach_error_handlers() {
        let dispatcher = EventDispatcher::new();
        let events = Arc::new(Mutex::new(0));
        let errors = Arc::new(Mutex::new(Vec::new()));

        {
            let events = events.clone();
            dispatcher.on_event(move |_| *events.lock() += 1);
        }
        {
            let errors = errors.clone();
            dispatcher.on_error(move |e| errors.lock().push(e.clone()));
        }

        dispatcher.publish_error(&ErrorEvent::read("boom"));
        assert_eq!(*events.lock(), 0);
        assert_eq!(errors.lock().len(), 1);
        assert_eq!(errors.lock()[0].kind, ErrorKind::Read);
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(Mutex::new(0));
        let id = {
            let count = count.clone();
            dispatcher.on_event(move |_| *count.lock() += 1)
        };

        dispatcher.publish(&update(1));
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        dispatcher.publish(&update(2));

        assert_eq!(*count.lock(), 1);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let slot: Arc<Mutex<Option<SubscriberId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let id = {
            let inner = dispatcher.clone();
            let slot = slot.clone();
            let calls = calls.clone();
            dispatcher.on_event(move |_| {
                *calls.lock() += 1;
                if let Some(id) = *slot.lock() {
                    inner.unsubscribe(id);
                }
            })
        };
        *slot.lock() = Some(id);

        dispatcher.publish(&update(1));
        dispatcher.publish(&update(2));
        assert_eq!(*calls.lock(), 1);
    }
}
