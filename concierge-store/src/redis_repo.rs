use async_trait::async_trait;
use concierge_core::repository::RepoError;
use concierge_core::session::SessionStore;
use redis::{AsyncCommands, RedisResult};
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    pub async fn revoke(&self, jti: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("revoked:{}", jti);
        conn.set_ex::<_, _, ()>(key, 1, ttl_seconds.max(1)).await?;
        info!("Token revoked: {}", jti);
        Ok(())
    }

    pub async fn is_token_revoked(&self, jti: &str) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("revoked:{}", jti);
        conn.exists(key).await
    }

    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }

    pub async fn clear(&self, key: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(key).await
    }
}

#[async_trait]
impl SessionStore for RedisClient {
    async fn revoke_token(&self, jti: &str, ttl_seconds: u64) -> Result<(), RepoError> {
        Ok(self.revoke(jti, ttl_seconds).await?)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, RepoError> {
        Ok(self.is_token_revoked(jti).await?)
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> Result<bool, RepoError> {
        Ok(RedisClient::check_rate_limit(self, key, limit, window_seconds).await?)
    }

    async fn reset_rate_limit(&self, key: &str) -> Result<(), RepoError> {
        Ok(self.clear(key).await?)
    }
}
