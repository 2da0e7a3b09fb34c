//! SSE (Server-Sent Events) framing
//!
//! Splits the byte stream into blank-line terminated records. Records may span
//! several reads and one read may carry several records.

use pushfeed_core::DecodeError;
use tracing::trace;

/// Largest record accepted before the parser gives up on it
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// One complete SSE record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    /// `event:` field, if present
    pub event: Option<String>,
    /// `id:` field, if present
    pub id: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    /// Buffer for incomplete lines
    buffer: Vec<u8>,
    /// Length of `buffer` already searched for a newline
    scanned: usize,
    /// Current record data being accumulated
    data_buffer: String,
    /// Current event type (if any)
    event_type: Option<String>,
    /// Current record id (if any)
    record_id: Option<String>,
    /// Set once the current record is known bad; cleared at its terminator
    discarding: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the parser and extract any complete records
    ///
    /// Blank lines with nothing accumulated and `:` comment lines are
    /// keep-alives and produce nothing. Lines that are not SSE fields count
    /// as record data.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<SseRecord, DecodeError>> {
        let mut records = Vec::new();

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(bytes);

        // Bytes before `self.scanned` hold no newline
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(len) = buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + len;
            let line = &buffer[start..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if let Some(record) = self.process_line(line) {
                records.push(record);
            }

            start = end + 1;
            from = start;
        }
        buffer.drain(..start);
        self.scanned = buffer.len();
        self.buffer = buffer;

        if self.buffer.len() + self.data_buffer.len() > MAX_RECORD_BYTES {
            self.buffer.clear();
            self.scanned = 0;
            if let Some(err) = self.abandon_record(DecodeError::RecordTooLarge {
                limit: MAX_RECORD_BYTES,
            }) {
                records.push(Err(err));
            }
        }

        records
    }

    /// Process a single line of SSE data
    fn process_line(&mut self, line: &[u8]) -> Option<Result<SseRecord, DecodeError>> {
        // Empty line signals end of record
        if line.is_empty() {
            return self.dispatch_record();
        }

        if self.discarding {
            return None;
        }

        if line.starts_with(b":") {
            trace!("SSE keep-alive comment");
            return None;
        }

        let line_str = match std::str::from_utf8(line) {
            Ok(s) => s,
            Err(_) => return self.abandon_record(DecodeError::InvalidUtf8).map(Err),
        };

        // Split on first colon
        let (field, value) = match line_str.find(':') {
            Some(colon_pos) => {
                let (f, v) = line_str.split_at(colon_pos);
                let v = &v[1..];
                (f, v.strip_prefix(' ').unwrap_or(v))
            }
            None => (line_str, ""),
        };

        match field {
            "data" => {
                if let Some(err) = self.push_data(value) {
                    return Some(Err(err));
                }
            }
            "event" => self.event_type = Some(value.to_string()),
            "id" => self.record_id = Some(value.to_string()),
            "retry" => {
                // Reconnection is decided outside this client
                trace!("SSE retry: {}", value);
            }
            _ => {
                // Bare payload line, e.g. a JSON envelope without `data:`
                trace!("SSE unprefixed line");
                if let Some(err) = self.push_data(line_str) {
                    return Some(Err(err));
                }
            }
        }

        None
    }

    /// Append one line to the record data
    fn push_data(&mut self, value: &str) -> Option<DecodeError> {
        if !self.data_buffer.is_empty() {
            self.data_buffer.push('\n');
        }
        self.data_buffer.push_str(value);
        if self.data_buffer.len() > MAX_RECORD_BYTES {
            return self.abandon_record(DecodeError::RecordTooLarge {
                limit: MAX_RECORD_BYTES,
            });
        }
        None
    }

    /// Drop the record in progress, returning the error to report for it.
    ///
    /// Only the first failure of a record is reported.
    fn abandon_record(&mut self, err: DecodeError) -> Option<DecodeError> {
        self.data_buffer.clear();
        self.event_type = None;
        self.record_id = None;
        if self.discarding {
            None
        } else {
            self.discarding = true;
            Some(err)
        }
    }

    /// Emit the accumulated record
    fn dispatch_record(&mut self) -> Option<Result<SseRecord, DecodeError>> {
        let event = self.event_type.take();
        let id = self.record_id.take();

        if std::mem::take(&mut self.discarding) {
            self.data_buffer.clear();
            return None;
        }

        if self.data_buffer.is_empty() {
            trace!("SSE keep-alive");
            return None;
        }

        Some(Ok(SseRecord {
            event,
            id,
            data: std::mem::take(&mut self.data_buffer),
        }))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn data_of(records: &[Result<SseRecord, DecodeError>]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.as_ref().unwrap().data.as_str())
            .collect()
    }

    #[test]
    fn test_parse_simple_record() {
        let mut parser = SseParser::new();

        let records = parser.feed(b"id: 1\nevent: message\ndata: {\"a\":1}\n\n");

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.data, "{\"a\":1}");
        assert_eq!(record.event.as_deref(), Some("message"));
        assert_eq!(record.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_multiple_records_in_one_read() {
        let mut parser = SseParser::new();

        let records = parser.feed(b"data: one\n\ndata: two\n\n");

        assert_eq!(data_of(&records), vec!["one", "two"]);
    }

    #[test]
    fn test_parse_chunked_data() {
        let mut parser = SseParser::new();

        assert!(parser.feed(b"data: {\"ts\":1,").is_empty());
        assert!(parser.feed(b"\"seq\":1}\n").is_empty());

        let records = parser.feed(b"\n");
        assert_eq!(data_of(&records), vec!["{\"ts\":1,\"seq\":1}"]);
    }

    #[test]
    fn test_multiline_data_and_crlf() {
        let mut parser = SseParser::new();

        let records = parser.feed(b"data: a\r\ndata: b\r\n\r\n");

        assert_eq!(data_of(&records), vec!["a\nb"]);
    }

    #[test]
    fn test_keep_alives_produce_nothing() {
        let mut parser = SseParser::new();

        assert!(parser.feed(b"\n").is_empty());
        assert!(parser.feed(b":keepalive\n\n").is_empty());
        assert!(parser.feed(b"event: keepalive\n\n").is_empty());
        assert!(parser.feed(Bytes::from_static(b"\n\n\n").as_ref()).is_empty());
    }

    #[test]
    fn test_invalid_utf8_reports_once_and_recovers() {
        let mut parser = SseParser::new();

        let records = parser.feed(b"data: \xff\xfe\ndata: \xff\n\ndata: ok\n\n");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Err(DecodeError::InvalidUtf8));
        assert_eq!(records[1].as_ref().unwrap().data, "ok");
    }

    #[test]
    fn test_oversized_record_is_dropped() {
        let mut parser = SseParser::new();

        let mut chunk = b"data: ".to_vec();
        chunk.extend(std::iter::repeat(b'x').take(MAX_RECORD_BYTES + 1));
        let records = parser.feed(&chunk);
        assert_eq!(
            records,
            vec![Err(DecodeError::RecordTooLarge {
                limit: MAX_RECORD_BYTES
            })]
        );

        // Rest of the oversized line, its terminator, then a good record
        let records = parser.feed(b"xxxx\n\ndata: next\n\n");
        assert_eq!(data_of(&records), vec!["next"]);
    }

    #[test]
    fn test_unprefixed_lines_are_data() {
        let mut parser = SseParser::new();

        let records = parser.feed(
            b"{\"data\":{\"type\":\"SPLIT_UPDATE\",\"changeNumber\":123}}\n\ngarbage not sse\n\n",
        );

        assert_eq!(
            data_of(&records),
            vec![
                "{\"data\":{\"type\":\"SPLIT_UPDATE\",\"changeNumber\":123}}",
                "garbage not sse"
            ]
        );
    }

    #[test]
    fn test_many_records_in_one_chunk() {
        let mut parser = SseParser::new();

        let chunk = "data: x\n\n".repeat(10_000);
        let records = parser.feed(chunk.as_bytes());

        assert_eq!(records.len(), 10_000);
    }

    #[test]
    fn test_long_line_fed_byte_by_byte() {
        let mut parser = SseParser::new();

        let line = format!("data: {}\n\n", "y".repeat(4096));
        let mut records = Vec::new();
        for byte in line.as_bytes() {
            records.extend(parser.feed(std::slice::from_ref(byte)));
        }

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().data.len(), 4096);
    }
}
