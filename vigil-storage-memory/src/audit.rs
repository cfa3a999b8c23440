use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use vigil_core::{
    AccountId, AuditEvent, Error,
    repositories::AuditRepository,
};

/// Bounded ring of audit events, newest first. Once `capacity` is reached
/// the oldest entries are silently evicted.
pub struct MemoryAuditRepository {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl MemoryAuditRepository {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn append(&self, event: AuditEvent) -> Result<(), Error> {
        let mut events = self.events.lock().unwrap();
        events.push_front(event);
        events.truncate(self.capacity);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, Error> {
        let events = self.events.lock().unwrap();
        Ok(events.iter().take(limit).cloned().collect())
    }

    async fn recent_for_account(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, Error> {
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| e.account_id.as_ref() == Some(account_id))
            .take(limit)
            .cloned()
            .collect())
    }
}
