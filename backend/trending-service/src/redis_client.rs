use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};

/// Redis handles shared by the leaderboard, the publisher and the pub/sub
/// bridge. The bridge needs the raw client since subscriptions cannot run on
/// the multiplexed manager.
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    manager: ConnectionManager,
}

impl RedisClient {
    pub async fn from_url(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;
        Ok(Self { client, manager })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
