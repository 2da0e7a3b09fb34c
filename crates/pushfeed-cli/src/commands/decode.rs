//! Decode command - offline decoding of a captured stream

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use pushfeed_client::streaming::SseParser;
use pushfeed_client::ErrorEvent;
use tracing::debug;

use crate::output::OutputContext;

/// Totals of one decode run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub events: usize,
    pub errors: usize,
}

/// Frame and decode a captured stream from `file`, or stdin when absent
pub fn decode(file: Option<&Path>, ctx: &OutputContext) -> Result<DecodeSummary> {
    let bytes = match file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read capture: {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    debug!(len = bytes.len(), "Decoding capture");
    let summary = decode_capture(&bytes, ctx);
    ctx.info(&format!(
        "{} event(s), {} error(s)",
        summary.events, summary.errors
    ));
    Ok(summary)
}

fn decode_capture(bytes: &[u8], ctx: &OutputContext) -> DecodeSummary {
    let mut parser = SseParser::new();
    let mut summary = DecodeSummary::default();

    let mut records = parser.feed(bytes);
    // terminate a trailing record that lacks its blank line
    records.extend(parser.feed(b"\n\n"));

    for record in records {
        let decoded = record.and_then(|record| pushfeed_core::decode(&record.data));
        match decoded {
            Ok(event) => {
                summary.events += 1;
                ctx.event(&event);
            }
            Err(err) => {
                summary.errors += 1;
                ctx.feed_error(&ErrorEvent::from(err));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn quiet() -> OutputContext {
        OutputContext::new(OutputFormat::Json, true, true)
    }

    #[test]
    fn test_decode_capture() {
        let capture = concat!(
            "\n",
            ":keepalive\n\n",
            "event: message\n",
            "data: {\"data\":\"{\\\"type\\\":\\\"SPLIT_UPDATE\\\",\\\"changeNumber\\\":1}\"}\n\n",
            "data: {\"data\":{\"type\":\"UNKNOWN_TYPE\"}}\n\n",
            "data: {\"data\":{\"type\":\"CONTROL\",\"controlType\":\"STREAMING_PAUSED\"}}\n",
        );

        let summary = decode_capture(capture.as_bytes(), &quiet());
        assert_eq!(
            summary,
            DecodeSummary {
                events: 2,
                errors: 1
            }
        );
    }

    #[test]
    fn test_decode_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "data: not-json\n\n").unwrap();

        let summary = decode(Some(file.path()), &quiet()).unwrap();
        assert_eq!(summary.errors, 1);
    }
}
