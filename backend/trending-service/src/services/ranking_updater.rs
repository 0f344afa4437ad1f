//! Single consumer of the event queue.
//!
//! Per engagement event: apply the delta, re-read the counters, recompute the
//! score, upsert the leaderboard, read back the top-N snapshot and publish it.
//! Being the only leaderboard writer rules out lost updates between
//! concurrent score recomputations.

use super::counter_store::CounterStore;
use super::event_queue::EventReceiver;
use super::leaderboard::LeaderboardStore;
use super::score::engagement_score;
use crate::error::{CounterStoreError, LeaderboardError, PublishError};
use crate::metrics;
use crate::models::{EngagementEvent, QueueItem, RankingSnapshot};
use crate::websocket::{Notification, NotificationPublisher};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("counter store: {0}")]
    Counters(#[from] CounterStoreError),

    #[error("leaderboard: {0}")]
    Leaderboard(#[from] LeaderboardError),

    #[error("publish: {0}")]
    Publish(#[from] PublishError),
}

impl UpdateError {
    /// Pipeline stage that failed, used as a metrics label
    pub fn stage(&self) -> &'static str {
        match self {
            UpdateError::Counters(_) => "counters",
            UpdateError::Leaderboard(_) => "leaderboard",
            UpdateError::Publish(PublishError::Serialization(_)) => "serialize",
            UpdateError::Publish(_) => "publish",
        }
    }
}

impl From<serde_json::Error> for UpdateError {
    fn from(e: serde_json::Error) -> Self {
        UpdateError::Publish(PublishError::Serialization(e))
    }
}

pub struct RankingUpdater {
    counters: Arc<dyn CounterStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
    publisher: Arc<dyn NotificationPublisher>,
    channel: String,
    top_n: usize,
}

impl RankingUpdater {
    pub fn new(
        counters: Arc<dyn CounterStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
        publisher: Arc<dyn NotificationPublisher>,
        channel: impl Into<String>,
        top_n: usize,
    ) -> Self {
        Self {
            counters,
            leaderboard,
            publisher,
            channel: channel.into(),
            top_n,
        }
    }

    /// Consume the queue until every producer is dropped or `shutdown` flips.
    ///
    /// Items still queued when shutdown arrives are discarded.
    pub async fn run(self, mut events: EventReceiver, mut shutdown: watch::Receiver<bool>) {
        info!(channel = %self.channel, top_n = self.top_n, "ranking updater started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("shutdown signal received, ranking updater stopping");
                    break;
                }
                item = events.next() => match item {
                    Some(item) => self.process(item).await,
                    None => {
                        info!("event queue closed, ranking updater stopping");
                        break;
                    }
                },
            }
        }

        events.close();
    }

    /// Handle one queue item; failures are logged and never propagate
    pub async fn process(&self, item: QueueItem) {
        let entity_id = item.entity_id();
        let result = match item {
            QueueItem::Engagement(event) => self.handle_engagement(event).await,
            QueueItem::Removed(id) => self.handle_removal(id).await,
        };

        match result {
            Ok(snapshot) => {
                metrics::record_update("ok");
                debug!(video_id = %entity_id, ranked = snapshot.len(), "ranking updated");
            }
            Err(e) => {
                metrics::record_update(e.stage());
                error!(
                    video_id = %entity_id,
                    stage = e.stage(),
                    error = %e,
                    "ranking update failed, skipping event"
                );
            }
        }
    }

    pub async fn handle_engagement(
        &self,
        event: EngagementEvent,
    ) -> Result<RankingSnapshot, UpdateError> {
        let id = event.entity_id;

        if event.delta != 0 {
            self.counters.apply_delta(id, event.kind, event.delta).await?;
        }

        let counters = self.counters.read_counters(id).await?;
        let score = engagement_score(&counters);

        // The denormalized score column is informational; the leaderboard is
        // what clients see, so keep going when it fails.
        if let Err(e) = self.counters.record_score(id, score).await {
            warn!(video_id = %id, error = %e, "failed to persist video score");
        }

        self.leaderboard.upsert(&id.to_string(), score).await?;
        debug!(video_id = %id, kind = %event.kind, delta = event.delta, score, "score recomputed");

        self.publish_snapshot().await
    }

    pub async fn handle_removal(&self, entity_id: Uuid) -> Result<RankingSnapshot, UpdateError> {
        self.leaderboard.remove(&entity_id.to_string()).await?;
        debug!(video_id = %entity_id, "video removed from leaderboard");

        self.publish_snapshot().await
    }

    /// Read the current top-N and publish it on the configured channel
    pub async fn publish_snapshot(&self) -> Result<RankingSnapshot, UpdateError> {
        let entries = self.leaderboard.top(self.top_n).await?;
        let snapshot = RankingSnapshot::from_entries(entries);

        let notification = Notification::trending(&snapshot)?;
        let receivers = self.publisher.publish(&self.channel, &notification).await?;
        metrics::record_snapshot_published();

        debug!(
            channel = %self.channel,
            receivers,
            videos = snapshot.len(),
            "trending snapshot published"
        );

        Ok(snapshot)
    }
}
