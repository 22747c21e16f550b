use async_trait::async_trait;
use choguuket_core::repository::SearchCache;
use choguuket_core::{CacheError, MatchSet, RequestId};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

fn backend(err: redis::RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}

fn search_key(id: RequestId) -> String {
    format!("search:{}", id)
}

/// [`SearchCache`] shared between bot replicas through Redis. Expiry is Redis' own `EX`.
#[derive(Clone)]
pub struct RedisSearchCache {
    client: redis::Client,
}

impl RedisSearchCache {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis replied {}", reply);
        Ok(())
    }
}

#[async_trait]
impl SearchCache for RedisSearchCache {
    async fn set(&self, id: RequestId, matches: &MatchSet, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(matches)?;
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(backend)?;
        // EX 0 is an error in Redis.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(search_key(id), payload, seconds).await.map_err(backend)?;
        debug!("Cached {} matches for request {} ({}s)", matches.len(), id, seconds);
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<MatchSet>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(backend)?;
        let payload: Option<String> = conn.get(search_key(id)).await.map_err(backend)?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
