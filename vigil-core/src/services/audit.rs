//! Audit sink service.
//!
//! Thin layer over the audit repository: appends events, mirrors each one to
//! the structured log, and exposes the operator-facing listings.

use std::sync::Arc;

use crate::{
    Error,
    account::AccountId,
    audit::AuditEvent,
    repositories::{AuditRepository, AuditRepositoryProvider},
};

pub struct AuditService<R: AuditRepositoryProvider> {
    repositories: Arc<R>,
}

impl<R: AuditRepositoryProvider> AuditService<R> {
    pub fn new(repositories: Arc<R>) -> Self {
        Self { repositories }
    }

    pub async fn record(&self, event: AuditEvent) -> Result<(), Error> {
        tracing::info!(
            action = %event.action,
            email = %event.email,
            outcome = ?event.outcome,
            risk_score = event.risk_score,
            details = %event.details,
            "audit event"
        );
        self.repositories.audit().append(event).await
    }

    /// Most recent events, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, Error> {
        self.repositories.audit().recent(limit).await
    }

    /// Most recent events for one account, newest first.
    pub async fn recent_for_account(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, Error> {
        self.repositories
            .audit()
            .recent_for_account(account_id, limit)
            .await
    }
}
