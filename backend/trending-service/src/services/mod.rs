pub mod counter_store;
pub mod event_queue;
pub mod leaderboard;
pub mod ranking_updater;
pub mod score;

pub use counter_store::{CounterStore, InMemoryCounterStore, PgCounterStore};
pub use event_queue::{EventQueue, EventReceiver};
pub use leaderboard::{InMemoryLeaderboard, LeaderboardStore, RedisLeaderboard};
pub use ranking_updater::{RankingUpdater, UpdateError};
pub use score::{calculate_engagement_score, engagement_score};
