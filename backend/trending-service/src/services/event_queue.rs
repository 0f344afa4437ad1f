//! In-process queue between engagement producers and the ranking updater.
//!
//! Producers never wait: a full queue is reported back so the request path
//! can answer immediately instead of stalling.

use crate::error::QueueError;
use crate::metrics;
use crate::models::{EngagementEvent, QueueItem};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use uuid::Uuid;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Create a bounded queue. A capacity of zero is raised to one.
pub fn channel(capacity: usize) -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventQueue { tx }, EventReceiver { rx })
}

/// Cloneable producer handle
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<QueueItem>,
}

impl EventQueue {
    pub fn enqueue(&self, event: EngagementEvent) -> Result<(), QueueError> {
        self.push(QueueItem::Engagement(event))
    }

    /// Queue the removal of a deleted video from the leaderboard
    pub fn enqueue_removal(&self, entity_id: Uuid) -> Result<(), QueueError> {
        self.push(QueueItem::Removed(entity_id))
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Items waiting for the consumer
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    fn push(&self, item: QueueItem) -> Result<(), QueueError> {
        match self.tx.try_send(item) {
            Ok(()) => {
                metrics::record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(item)) => {
                warn!(
                    video_id = %item.entity_id(),
                    capacity = self.capacity(),
                    "event queue full, dropping engagement event"
                );
                metrics::record_rejected("full");
                Err(QueueError::Full {
                    capacity: self.capacity(),
                })
            }
            Err(TrySendError::Closed(item)) => {
                warn!(video_id = %item.entity_id(), "event queue closed, dropping engagement event");
                metrics::record_rejected("closed");
                Err(QueueError::Closed)
            }
        }
    }
}

/// Single consumer end of the queue
pub struct EventReceiver {
    rx: mpsc::Receiver<QueueItem>,
}

impl EventReceiver {
    /// Wait for the next item; `None` once every producer is gone
    pub async fn next(&mut self) -> Option<QueueItem> {
        self.rx.recv().await
    }

    /// Stop accepting new items; already queued items can still be read
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngagementKind;

    #[tokio::test]
    async fn test_items_arrive_in_enqueue_order() {
        let (queue, mut events) = channel(8);
        let id = Uuid::new_v4();

        queue
            .enqueue(EngagementEvent::created(id, EngagementKind::View))
            .unwrap();
        queue
            .enqueue(EngagementEvent::created(id, EngagementKind::Like))
            .unwrap();
        queue.enqueue_removal(id).unwrap();

        assert_eq!(
            events.next().await,
            Some(QueueItem::Engagement(EngagementEvent::created(
                id,
                EngagementKind::View
            )))
        );
        assert_eq!(
            events.next().await,
            Some(QueueItem::Engagement(EngagementEvent::created(
                id,
                EngagementKind::Like
            )))
        );
        assert_eq!(events.next().await, Some(QueueItem::Removed(id)));
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_blocking() {
        let (queue, _events) = channel(2);
        let event = EngagementEvent::created(Uuid::new_v4(), EngagementKind::Like);

        queue.enqueue(event).unwrap();
        queue.enqueue(event).unwrap();
        assert_eq!(queue.pending(), 2);

        assert_eq!(queue.enqueue(event), Err(QueueError::Full { capacity: 2 }));
    }

    #[tokio::test]
    async fn test_closed_queue_rejects() {
        let (queue, mut events) = channel(2);
        events.close();

        let err = queue
            .enqueue(EngagementEvent::created(Uuid::new_v4(), EngagementKind::View))
            .unwrap_err();
        assert_eq!(err, QueueError::Closed);
    }

    #[tokio::test]
    async fn test_receiver_ends_when_producers_dropped() {
        let (queue, mut events) = channel(2);
        drop(queue);
        assert_eq!(events.next().await, None);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (queue, _events) = channel(0);
        assert_eq!(queue.capacity(), 1);
    }
}
