//! Two-tier cache shared by every source adapter.
//!
//! Reads try the primary (shared) store first and fall through to the bounded
//! in-process tier on a miss or any primary error. Writes go to both tiers; a
//! primary write failure is logged and swallowed. There is no single-flight
//! protection: concurrent misses on one key each fetch from the origin.

pub mod key;
pub mod memory;
pub mod redis_store;

pub use key::CacheKey;
pub use memory::MemoryStore;
pub use redis_store::{PrimaryStore, RedisStore};

use crate::config::CacheConfig;
use crate::error::CacheError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct TwoTierCache {
    primary: Option<Arc<dyn PrimaryStore>>,
    memory: MemoryStore,
    /// Set after a primary failure so the outage is logged once, not per call.
    primary_down: AtomicBool,
}

impl TwoTierCache {
    pub fn new(primary: Option<Arc<dyn PrimaryStore>>, memory: MemoryStore) -> Self {
        Self {
            primary,
            memory,
            primary_down: AtomicBool::new(false),
        }
    }

    pub fn memory_only(capacity: usize) -> Self {
        Self::new(None, MemoryStore::new(capacity, 0.2))
    }

    /// Connects to the configured shared store; falls back to memory-only
    /// when none is configured or it cannot be reached.
    pub async fn from_config(config: &CacheConfig) -> Self {
        let memory = MemoryStore::new(config.memory_capacity, config.eviction_fraction);
        let primary: Option<Arc<dyn PrimaryStore>> = match &config.redis_url {
            Some(url) => {
                let timeout = Duration::from_millis(config.connect_timeout_ms);
                match RedisStore::connect(url, timeout).await {
                    Ok(store) => Some(Arc::new(store)),
                    Err(e) => {
                        log::warn!("Shared cache unavailable, using memory only: {}", e);
                        None
                    }
                }
            }
            None => None,
        };
        Self::new(primary, memory)
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        if let Some(primary) = &self.primary {
            match primary.get(key.as_str()).await {
                Ok(Some(value)) => {
                    self.mark_primary_up();
                    return Some(value);
                }
                Ok(None) => self.mark_primary_up(),
                Err(e) => self.mark_primary_down(&e),
            }
        }
        self.memory.get(key.as_str())
    }

    pub async fn set(&self, key: &CacheKey, value: String, ttl_secs: u64) {
        if let Some(primary) = &self.primary {
            match primary.set(key.as_str(), &value, ttl_secs).await {
                Ok(()) => self.mark_primary_up(),
                Err(e) => self.mark_primary_down(&e),
            }
        }
        self.memory
            .set(key.as_str(), value, Duration::from_secs(ttl_secs));
    }

    pub async fn del(&self, key: &CacheKey) {
        if let Some(primary) = &self.primary {
            if let Err(e) = primary.del(key.as_str()).await {
                self.mark_primary_down(&e);
            }
        }
        self.memory.del(key.as_str());
    }

    /// Decodes a cached JSON value; undecodable entries count as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("Dropping undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, raw, ttl_secs).await,
            Err(e) => log::warn!("{}", CacheError::from(e)),
        }
    }

    fn mark_primary_down(&self, e: &CacheError) {
        if !self.primary_down.swap(true, Ordering::Relaxed) {
            log::warn!("Shared cache failing, serving from memory tier: {}", e);
        }
    }

    fn mark_primary_up(&self) {
        if self.primary_down.swap(false, Ordering::Relaxed) {
            log::info!("Shared cache reachable again");
        }
    }
}
