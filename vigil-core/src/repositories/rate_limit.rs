//! Repository trait for sliding-window rate buckets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Error;

/// Storage operations for per-key attempt timestamps.
///
/// Keys are opaque strings scoped by the caller (e.g. `login:{email}`).
/// Entries older than the window are pruned lazily on each check; there is
/// no background sweeper. The read-prune-append sequence is serialized by
/// the service; the repository guarantees each single call is atomic.
#[async_trait]
pub trait RateLimitRepository: Send + Sync + 'static {
    /// Append an attempt timestamp for `key`.
    async fn record(&self, key: &str, at: DateTime<Utc>) -> Result<(), Error>;

    /// Drop attempts older than `cutoff` for `key`.
    async fn prune_before(&self, key: &str, cutoff: DateTime<Utc>) -> Result<(), Error>;

    /// Count attempts at or after `since` for `key`.
    async fn count_since(&self, key: &str, since: DateTime<Utc>) -> Result<u32, Error>;
}
