//! Leaderboard store: entity id -> score, ordered by score descending.
//!
//! The production backend is a Redis sorted set. Redis orders members with
//! equal scores lexicographically, and `ZREVRANGE` reverses that, so ties come
//! back in descending member order. The in-memory backend reproduces the same
//! tie-break so both stores rank identically.

use crate::error::LeaderboardError;
use crate::models::LeaderboardEntry;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

pub const DEFAULT_LEADERBOARD_KEY: &str = "video:scores";

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Insert or update the score of `entity_id`
    async fn upsert(&self, entity_id: &str, score: f64) -> Result<(), LeaderboardError>;

    /// Remove `entity_id`; absent ids are not an error
    async fn remove(&self, entity_id: &str) -> Result<(), LeaderboardError>;

    /// Up to `n` entries, highest score first
    async fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

/// Sorted-set leaderboard stored under a single Redis key
#[derive(Clone)]
pub struct RedisLeaderboard {
    conn: ConnectionManager,
    key: String,
}

impl RedisLeaderboard {
    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl LeaderboardStore for RedisLeaderboard {
    async fn upsert(&self, entity_id: &str, score: f64) -> Result<(), LeaderboardError> {
        let mut conn = self.conn.clone();
        // ZADD video:scores {score} {entity_id}
        conn.zadd::<_, _, _, ()>(&self.key, entity_id, score).await?;
        Ok(())
    }

    async fn remove(&self, entity_id: &str) -> Result<(), LeaderboardError> {
        let mut conn = self.conn.clone();
        conn.zrem::<_, _, ()>(&self.key, entity_id).await?;
        Ok(())
    }

    async fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        // ZREVRANGE video:scores 0 {n-1} WITHSCORES
        let results: Vec<(String, f64)> = conn
            .zrevrange_withscores(&self.key, 0, (n - 1) as isize)
            .await?;

        Ok(results
            .into_iter()
            .map(|(entity_id, score)| LeaderboardEntry { entity_id, score })
            .collect())
    }
}

#[derive(Debug, Clone)]
struct RankKey {
    score: f64,
    entity_id: String,
}

impl Ord for RankKey {
    // Highest score first, ties by member descending.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.entity_id.cmp(&self.entity_id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

#[derive(Default)]
struct Board {
    order: BTreeSet<RankKey>,
    scores: HashMap<String, f64>,
}

/// Process-local leaderboard used for single-instance deployments and tests
#[derive(Default)]
pub struct InMemoryLeaderboard {
    inner: RwLock<Board>,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.scores.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn score(&self, entity_id: &str) -> Option<f64> {
        self.inner.read().await.scores.get(entity_id).copied()
    }
}

#[async_trait]
impl LeaderboardStore for InMemoryLeaderboard {
    async fn upsert(&self, entity_id: &str, score: f64) -> Result<(), LeaderboardError> {
        let mut board = self.inner.write().await;

        if let Some(previous) = board.scores.insert(entity_id.to_string(), score) {
            board.order.remove(&RankKey {
                score: previous,
                entity_id: entity_id.to_string(),
            });
        }
        board.order.insert(RankKey {
            score,
            entity_id: entity_id.to_string(),
        });

        Ok(())
    }

    async fn remove(&self, entity_id: &str) -> Result<(), LeaderboardError> {
        let mut board = self.inner.write().await;

        if let Some(score) = board.scores.remove(entity_id) {
            board.order.remove(&RankKey {
                score,
                entity_id: entity_id.to_string(),
            });
        }

        Ok(())
    }

    async fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let board = self.inner.read().await;

        Ok(board
            .order
            .iter()
            .take(n)
            .map(|key| LeaderboardEntry::new(key.entity_id.clone(), key.score))
            .collect())
    }
}
