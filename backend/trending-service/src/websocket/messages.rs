/// Notification envelope pushed to websocket clients
use crate::models::RankingSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TRENDING_VIDEOS: &str = "trending_videos";

/// `{"type": ..., "payload": ..., "updated": "<RFC3339>"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    #[serde(with = "rfc3339_seconds")]
    pub updated: DateTime<Utc>,
}

impl Notification {
    pub fn new<T: Serialize>(kind: impl Into<String>, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: kind.into(),
            payload: serde_json::to_value(payload)?,
            updated: Utc::now(),
        })
    }

    /// Wrap a ranking snapshot as a `trending_videos` notification
    pub fn trending(snapshot: &RankingSnapshot) -> Result<Self, serde_json::Error> {
        Self::new(TRENDING_VIDEOS, snapshot)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

mod rfc3339_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
