use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of interaction recorded against a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    View,
    Like,
    Comment,
}

impl EngagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::View => "view",
            EngagementKind::Like => "like",
            EngagementKind::Comment => "comment",
        }
    }

    /// Counter column holding this kind of engagement in the `videos` table
    pub fn counter_column(&self) -> &'static str {
        match self {
            EngagementKind::View => "views",
            EngagementKind::Like => "likes",
            EngagementKind::Comment => "comments",
        }
    }
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single engagement delta produced when an interaction is created (+1)
/// or deleted (-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    #[serde(rename = "video_id")]
    pub entity_id: Uuid,
    pub kind: EngagementKind,
    pub delta: i64,
}

impl EngagementEvent {
    pub fn new(entity_id: Uuid, kind: EngagementKind, delta: i64) -> Self {
        Self {
            entity_id,
            kind,
            delta,
        }
    }

    pub fn created(entity_id: Uuid, kind: EngagementKind) -> Self {
        Self::new(entity_id, kind, 1)
    }

    pub fn deleted(entity_id: Uuid, kind: EngagementKind) -> Self {
        Self::new(entity_id, kind, -1)
    }
}

/// Engagement counters as exposed by the persistent video store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

impl EngagementCounters {
    pub fn new(views: i64, likes: i64, comments: i64) -> Self {
        Self {
            views,
            likes,
            comments,
        }
    }

    pub fn apply(&mut self, kind: EngagementKind, delta: i64) {
        let counter = match kind {
            EngagementKind::View => &mut self.views,
            EngagementKind::Like => &mut self.likes,
            EngagementKind::Comment => &mut self.comments,
        };
        *counter = counter.saturating_add(delta);
    }
}

/// One member of the leaderboard sorted set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub entity_id: String,
    pub score: f64,
}

impl LeaderboardEntry {
    pub fn new(entity_id: impl Into<String>, score: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVideo {
    pub rank: usize,
    pub video_id: String,
    pub score: f64,
}

/// Top-N ranking at a point in time, rank 1 being the highest score.
///
/// Serializes as `{"videos": [...]}`, which is the payload of the
/// `trending_videos` notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub videos: Vec<RankedVideo>,
}

impl RankingSnapshot {
    /// Build a snapshot from entries already ordered by score descending
    pub fn from_entries(entries: Vec<LeaderboardEntry>) -> Self {
        let videos = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RankedVideo {
                rank: i + 1,
                video_id: entry.entity_id,
                score: entry.score,
            })
            .collect();

        Self { videos }
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

/// Work item carried by the event queue.
///
/// Removals travel through the same queue as engagement deltas so the
/// ranking updater stays the only writer of the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItem {
    Engagement(EngagementEvent),
    Removed(Uuid),
}

impl QueueItem {
    pub fn entity_id(&self) -> Uuid {
        match self {
            QueueItem::Engagement(event) => event.entity_id,
            QueueItem::Removed(id) => *id,
        }
    }
}
