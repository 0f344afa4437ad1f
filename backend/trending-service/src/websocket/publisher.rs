use super::{ConnectionHub, Notification};
use crate::error::PublishError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

/// Delivers notification envelopes to the subscribers of a channel.
///
/// Delivery is best-effort: having nobody listening is still a success.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Returns the number of receivers reached
    async fn publish(
        &self,
        channel: &str,
        notification: &Notification,
    ) -> Result<usize, PublishError>;
}

/// Cross-process delivery over Redis pub/sub
#[derive(Clone)]
pub struct RedisPublisher {
    conn: ConnectionManager,
}

impl RedisPublisher {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl NotificationPublisher for RedisPublisher {
    async fn publish(
        &self,
        channel: &str,
        notification: &Notification,
    ) -> Result<usize, PublishError> {
        let payload = notification.to_json()?;

        let mut conn = self.conn.clone();
        let receivers: usize = conn.publish(channel, payload).await?;

        debug!(%channel, receivers, kind = %notification.kind, "notification published");
        Ok(receivers)
    }
}

/// In-process delivery straight into the connection hub
#[derive(Clone)]
pub struct LocalPublisher {
    hub: ConnectionHub,
}

impl LocalPublisher {
    pub fn new(hub: ConnectionHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl NotificationPublisher for LocalPublisher {
    async fn publish(
        &self,
        channel: &str,
        notification: &Notification,
    ) -> Result<usize, PublishError> {
        let payload = notification.to_json()?;
        let report = self.hub.broadcast(payload).await;

        debug!(
            %channel,
            delivered = report.delivered,
            dropped = report.dropped,
            kind = %notification.kind,
            "notification broadcast locally"
        );
        Ok(report.delivered)
    }
}
