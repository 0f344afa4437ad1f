//! Engagement counters owned by the persistent video store.
//!
//! The ranking pipeline never writes video rows itself beyond the three calls
//! exposed here. The Postgres implementation expects the table owned by the
//! video API:
//!
//! ```sql
//! CREATE TABLE videos (
//!     id       UUID PRIMARY KEY,
//!     views    BIGINT NOT NULL DEFAULT 0,
//!     likes    BIGINT NOT NULL DEFAULT 0,
//!     comments BIGINT NOT NULL DEFAULT 0,
//!     score    DOUBLE PRECISION NOT NULL DEFAULT 0
//! );
//! ```

use crate::error::CounterStoreError;
use crate::models::{EngagementCounters, EngagementKind};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add `delta` to the counter matching `kind`
    async fn apply_delta(
        &self,
        entity_id: Uuid,
        kind: EngagementKind,
        delta: i64,
    ) -> Result<(), CounterStoreError>;

    async fn read_counters(&self, entity_id: Uuid)
        -> Result<EngagementCounters, CounterStoreError>;

    /// Persist the denormalized score next to the counters
    async fn record_score(&self, entity_id: Uuid, score: f64) -> Result<(), CounterStoreError>;
}

#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn apply_delta(
        &self,
        entity_id: Uuid,
        kind: EngagementKind,
        delta: i64,
    ) -> Result<(), CounterStoreError> {
        let column = kind.counter_column();
        let sql = format!("UPDATE videos SET {column} = {column} + $1 WHERE id = $2");

        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(entity_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CounterStoreError::NotFound(entity_id));
        }

        Ok(())
    }

    async fn read_counters(
        &self,
        entity_id: Uuid,
    ) -> Result<EngagementCounters, CounterStoreError> {
        let row: Option<(i64, i64, i64)> =
            sqlx::query_as("SELECT views, likes, comments FROM videos WHERE id = $1")
                .bind(entity_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(views, likes, comments)| EngagementCounters::new(views, likes, comments))
            .ok_or(CounterStoreError::NotFound(entity_id))
    }

    async fn record_score(&self, entity_id: Uuid, score: f64) -> Result<(), CounterStoreError> {
        sqlx::query("UPDATE videos SET score = $1 WHERE id = $2")
            .bind(score)
            .bind(entity_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[derive(Default)]
struct VideoCounters {
    counters: HashMap<Uuid, EngagementCounters>,
    scores: HashMap<Uuid, f64>,
}

/// Counter store kept in process memory.
///
/// Unknown videos start from zero on their first delta; reading a video that
/// never received one is `NotFound`.
#[derive(Default)]
pub struct InMemoryCounterStore {
    inner: RwLock<VideoCounters>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a video with existing counters
    pub async fn insert(&self, entity_id: Uuid, counters: EngagementCounters) {
        self.inner.write().await.counters.insert(entity_id, counters);
    }

    pub async fn recorded_score(&self, entity_id: Uuid) -> Option<f64> {
        self.inner.read().await.scores.get(&entity_id).copied()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn apply_delta(
        &self,
        entity_id: Uuid,
        kind: EngagementKind,
        delta: i64,
    ) -> Result<(), CounterStoreError> {
        self.inner
            .write()
            .await
            .counters
            .entry(entity_id)
            .or_default()
            .apply(kind, delta);
        Ok(())
    }

    async fn read_counters(
        &self,
        entity_id: Uuid,
    ) -> Result<EngagementCounters, CounterStoreError> {
        self.inner
            .read()
            .await
            .counters
            .get(&entity_id)
            .copied()
            .ok_or(CounterStoreError::NotFound(entity_id))
    }

    async fn record_score(&self, entity_id: Uuid, score: f64) -> Result<(), CounterStoreError> {
        self.inner.write().await.scores.insert(entity_id, score);
        Ok(())
    }
}
