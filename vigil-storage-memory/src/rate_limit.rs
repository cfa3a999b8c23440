use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vigil_core::{Error, repositories::RateLimitRepository};

/// Attempt timestamps per key. Pruning happens lazily through
/// `prune_before`; there is no background sweeper.
pub struct MemoryRateLimitRepository {
    buckets: DashMap<String, Vec<DateTime<Utc>>>,
}

impl MemoryRateLimitRepository {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }
}

impl Default for MemoryRateLimitRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitRepository for MemoryRateLimitRepository {
    async fn record(&self, key: &str, at: DateTime<Utc>) -> Result<(), Error> {
        self.buckets.entry(key.to_string()).or_default().push(at);
        Ok(())
    }

    async fn prune_before(&self, key: &str, cutoff: DateTime<Utc>) -> Result<(), Error> {
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            bucket.retain(|t| *t >= cutoff);
        }
        Ok(())
    }

    async fn count_since(&self, key: &str, since: DateTime<Utc>) -> Result<u32, Error> {
        Ok(self
            .buckets
            .get(key)
            .map(|b| b.iter().filter(|t| **t >= since).count() as u32)
            .unwrap_or(0))
    }
}
