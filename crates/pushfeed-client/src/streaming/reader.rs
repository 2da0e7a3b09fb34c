//! Read loop over an open notification stream

use std::fmt::Display;
use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use pushfeed_core::{decode, ErrorEvent, EventDispatcher, Status, StatusStore};
use tokio::sync::watch;
use tracing::{debug, trace};

use super::parser::{SseParser, SseRecord};

/// Why the read loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Stop was requested
    Cancelled,
    /// The stream failed, timed out or was closed by the server
    Failed(ErrorEvent),
}

/// Resolve once stop has been requested or the stop sender is gone
pub(crate) async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

/// Frames, decodes and dispatches everything read from `stream`
pub struct StreamReader<S> {
    stream: S,
    parser: SseParser,
    read_timeout: Duration,
}

impl<S, E> StreamReader<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Display,
{
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream,
            parser: SseParser::new(),
            read_timeout,
        }
    }

    /// Read until stop is requested or the stream fails
    ///
    /// Decode failures are published and reading continues. Records are only
    /// decoded while `status` is [`Status::Connected`].
    pub async fn run(
        &mut self,
        status: &StatusStore,
        dispatcher: &EventDispatcher,
        stop: &mut watch::Receiver<bool>,
    ) -> ReadOutcome {
        debug!("Reading stream");

        loop {
            let next = tokio::select! {
                biased;
                _ = stop_requested(stop) => {
                    debug!("Stop read stream");
                    return ReadOutcome::Cancelled;
                }
                next = tokio::time::timeout(self.read_timeout, self.stream.next()) => next,
            };

            match next {
                Ok(Some(Ok(chunk))) => {
                    trace!(len = chunk.len(), "Read stream chunk");
                    for record in self.parser.feed(&chunk) {
                        match record {
                            Ok(record) => Self::handle_record(record, status, dispatcher),
                            Err(err) => dispatcher.publish_error(&err.into()),
                        }
                    }
                }
                Ok(Some(Err(e))) => return ReadOutcome::Failed(ErrorEvent::read(e.to_string())),
                Ok(None) => {
                    return ReadOutcome::Failed(ErrorEvent::read("Stream closed by server"));
                }
                Err(_) => {
                    return ReadOutcome::Failed(ErrorEvent::read(format!(
                        "No data received for {} ms",
                        self.read_timeout.as_millis()
                    )));
                }
            }
        }
    }

    fn handle_record(record: SseRecord, status: &StatusStore, dispatcher: &EventDispatcher) {
        if status.get() != Status::Connected {
            trace!("Dropping record received while not connected");
            return;
        }

        trace!(event = ?record.event, id = ?record.id, "Decoding record");
        match decode(&record.data) {
            Ok(event) => dispatcher.publish(&event),
            Err(err) => dispatcher.publish_error(&err.into()),
        }
    }
}
