//! Watch command - live notification stream

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use pushfeed_client::{ErrorEvent, EventSourceClient, EventSourceConfig};

use crate::output::OutputContext;

/// Connect to the feed and print everything it sends until Ctrl+C
///
/// Fails if the stream ends on its own with a connect or read error.
pub async fn watch(config: EventSourceConfig, ctx: &OutputContext) -> Result<()> {
    let client = EventSourceClient::new(config).context("Failed to create feed client")?;
    let failure: Arc<Mutex<Option<ErrorEvent>>> = Arc::new(Mutex::new(None));

    {
        let ctx = *ctx;
        client.on_event(move |event| ctx.event(event));
    }
    {
        let ctx = *ctx;
        let failure = failure.clone();
        client.on_error(move |error| {
            ctx.feed_error(error);
            if error.kind.is_terminal() {
                *failure.lock() = Some(error.clone());
            }
        });
    }

    ctx.info(&format!("Connecting to {}...", client.url()));
    ctx.info("Press Ctrl+C to stop");
    client.connect().context("Failed to start feed client")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            ctx.info("\nDisconnecting...");
            client.disconnect().await;
            ctx.success("Disconnected");
            Ok(())
        }
        _ = client.closed() => {
            client.disconnect().await;
            let failure = failure.lock().take();
            match failure {
                Some(error) => bail!("Stream ended: {}", error),
                None => {
                    ctx.info("Stream ended");
                    Ok(())
                }
            }
        }
    }
}
