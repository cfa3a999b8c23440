//! Sliding-window rate limiting.
//!
//! Each key holds a bucket of attempt timestamps. Checks prune entries older
//! than the window, then count; the read-prune-append sequence is serialized
//! per key so concurrent bursts cannot slip past the limit.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    Error,
    clock::Clock,
    error::AuthError,
    lock::KeyedLock,
    repositories::{RateLimitRepository, RateLimitRepositoryProvider},
};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Attempts allowed inside one window.
    pub max_attempts: u32,
    /// Width of the sliding window.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::seconds(60),
        }
    }
}

pub struct RateLimitService<R: RateLimitRepositoryProvider> {
    repositories: Arc<R>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
    locks: KeyedLock<String>,
}

impl<R: RateLimitRepositoryProvider> RateLimitService<R> {
    pub fn new(repositories: Arc<R>, clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self {
            repositories,
            clock,
            config,
            locks: KeyedLock::new(),
        }
    }

    /// Record one attempt for `key`, failing with
    /// [`AuthError::RateLimited`] if the window is already full. The attempt
    /// is recorded only when admitted.
    pub async fn check_and_record(&self, key: &str) -> Result<(), Error> {
        let _guard = self.locks.acquire(key.to_string()).await;

        let now = self.clock.now();
        let window_start = now - self.config.window;
        let repo = self.repositories.rate_limit();

        repo.prune_before(key, window_start).await?;
        let attempts = repo.count_since(key, window_start).await?;

        if attempts >= self.config.max_attempts {
            tracing::warn!(key = key, attempts = attempts, "rate limit exceeded");
            return Err(AuthError::RateLimited {
                retry_after_seconds: self.config.window.num_seconds(),
            }
            .into());
        }

        repo.record(key, now).await?;
        Ok(())
    }
}
