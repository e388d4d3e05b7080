use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use deadpool_redis::Pool;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::StorageError;

/// Storage of the refresh tokens handed out at sign-in
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(&self, token: &str, user_id: Uuid, ttl: Duration) -> Result<(), StorageError>;

    /// The user owning a token, if the token is known and not expired
    async fn user_of(&self, token: &str) -> Result<Option<Uuid>, StorageError>;

    async fn revoke(&self, token: &str) -> Result<(), StorageError>;
}

pub struct RedisTokenStore {
    pool: Pool,
}

impl RedisTokenStore {
    pub fn new(pool: Pool) -> Self {
        RedisTokenStore { pool }
    }
}

fn redis_key(token: &str) -> String {
    format!("user.refresh-token.{token}")
}

#[async_trait]
impl RefreshTokenStore for RedisTokenStore {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn save(&self, token: &str, user_id: Uuid, ttl: Duration) -> Result<(), StorageError> {
        let mut redis = self.pool.get().await?;

        redis::cmd("SET")
            .arg(redis_key(token))
            .arg(user_id.to_string())
            .arg("EX")
            .arg(ttl.num_seconds().max(1))
            .query_async::<_, ()>(&mut redis)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn user_of(&self, token: &str) -> Result<Option<Uuid>, StorageError> {
        let mut redis = self.pool.get().await?;
        let value: Option<String> = redis.get(redis_key(token)).await?;

        // Something else than a uuid under our key is as good as nothing
        Ok(value.and_then(|id| Uuid::parse_str(&id).ok()))
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn revoke(&self, token: &str) -> Result<(), StorageError> {
        let mut redis = self.pool.get().await?;
        redis.del::<_, ()>(redis_key(token)).await?;

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, (Uuid, DateTime<Utc>)>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryTokenStore {
    async fn save(&self, token: &str, user_id: Uuid, ttl: Duration) -> Result<(), StorageError> {
        self.tokens
            .write()
            .await
            .insert(token.to_owned(), (user_id, Utc::now() + ttl));

        Ok(())
    }

    async fn user_of(&self, token: &str) -> Result<Option<Uuid>, StorageError> {
        let tokens = self.tokens.read().await;

        Ok(tokens
            .get(token)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(user_id, _)| *user_id))
    }

    async fn revoke(&self, token: &str) -> Result<(), StorageError> {
        self.tokens.write().await.remove(token);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_tokens_expire_and_can_be_revoked() {
        let store = MemoryTokenStore::new();
        let user_id = Uuid::new_v4();

        store.save("valid", user_id, Duration::days(1)).await.unwrap();
        store.save("expired", user_id, Duration::seconds(-1)).await.unwrap();

        assert_eq!(store.user_of("valid").await.unwrap(), Some(user_id));
        assert_eq!(store.user_of("expired").await.unwrap(), None);
        assert_eq!(store.user_of("unknown").await.unwrap(), None);

        store.revoke("valid").await.unwrap();
        assert_eq!(store.user_of("valid").await.unwrap(), None);
    }
}
