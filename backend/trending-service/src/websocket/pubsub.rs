//! Redis pub/sub bridge: every message published on the ranking channel is
//! broadcast verbatim to the local connection hub.

use super::{BroadcastReport, ConnectionHub};
use crate::metrics;
use futures_util::StreamExt;
use redis::Client;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const DEFAULT_NOTIFY_CHANNEL: &str = "ws:updates";

/// Pause before resubscribing after the subscription drops
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Run until `shutdown` flips, resubscribing whenever the connection drops
pub async fn start_pubsub_listener(
    client: Client,
    channel: String,
    hub: ConnectionHub,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(%channel, "starting ranking pub/sub bridge");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            res = forward_messages(&client, &channel, &hub) => match res {
                Ok(()) => warn!(%channel, "pub/sub stream ended, resubscribing"),
                Err(e) => error!(error = %e, %channel, "pub/sub subscription failed"),
            },
            _ = shutdown.changed() => break,
        }

        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = shutdown.changed() => break,
        }
    }

    info!(%channel, "ranking pub/sub bridge stopped");
}

async fn forward_messages(
    client: &Client,
    channel: &str,
    hub: &ConnectionHub,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not the multiplexed manager
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!(%channel, "subscribed to ranking updates");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to read pub/sub payload");
                metrics::record_pubsub_message("unreadable");
                continue;
            }
        };

        forward_payload(hub, payload).await;
    }

    Ok(())
}

/// Broadcast one published payload. Payloads that are not JSON are logged
/// and discarded.
pub async fn forward_payload(hub: &ConnectionHub, payload: String) -> Option<BroadcastReport> {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&payload) {
        warn!(error = %e, "discarding malformed ranking update");
        metrics::record_pubsub_message("malformed");
        return None;
    }

    let report = hub.broadcast(payload).await;
    metrics::record_pubsub_message("forwarded");
    debug!(
        delivered = report.delivered,
        dropped = report.dropped,
        "forwarded ranking update to websocket clients"
    );

    Some(report)
}
