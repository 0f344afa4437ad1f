use crate::{
    config::Config,
    services::{EventQueue, LeaderboardStore},
    websocket::ConnectionHub,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: ConnectionHub,
    /// Producer side of the engagement queue
    pub queue: EventQueue,
    /// Read access for the trending endpoint; writes go through the queue
    pub leaderboard: Arc<dyn LeaderboardStore>,
}
