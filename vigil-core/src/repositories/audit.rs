//! Repository trait for the append-only audit log.

use async_trait::async_trait;

use crate::{Error, account::AccountId, audit::AuditEvent};

/// Storage operations for audit events.
///
/// The log is append-only and bounded: implementations retain the most
/// recent N events (500 by default) and silently evict the oldest. Appends
/// must be safe under concurrent writers, and each writer's own events must
/// never be reordered relative to each other; a global total order across
/// writers is not required.
#[async_trait]
pub trait AuditRepository: Send + Sync + 'static {
    async fn append(&self, event: AuditEvent) -> Result<(), Error>;

    /// The most recent events, newest first, at most `limit`.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, Error>;

    /// The most recent events for one account, newest first, at most `limit`.
    async fn recent_for_account(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, Error>;
}
