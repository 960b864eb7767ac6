use crate::error::CacheError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::timeout;

/// Shared key-value store in front of the memory tier.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Redis-backed primary tier. Each command is bounded by `op_timeout` so an
/// unreachable server degrades into a cache miss instead of a stall.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisStore {
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = timeout(op_timeout, client.get_connection_manager())
            .await
            .map_err(|_| CacheError::Unavailable(format!("connect to {} timed out", url)))??;
        log::info!("Connected to shared cache at {}", url);
        Ok(Self { conn, op_timeout })
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Unavailable("command timed out".to_string())),
        }
    }
}

#[async_trait]
impl PrimaryStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.set_ex::<_, _, ()>(key, value, ttl_secs.max(1)).await })
            .await
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.del::<_, ()>(key).await }).await
    }
}
