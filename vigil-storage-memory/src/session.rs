use async_trait::async_trait;
use dashmap::DashMap;
use vigil_core::{
    AccountId, Error, Session, SessionToken,
    repositories::SessionRepository,
};

/// Sessions keyed by opaque token.
pub struct MemorySessionRepository {
    sessions: DashMap<SessionToken, Session>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl Default for MemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: Session) -> Result<(), Error> {
        self.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        Ok(self.sessions.get(token).map(|s| s.clone()))
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        self.sessions.remove(token);
        Ok(())
    }

    async fn delete_for_account(&self, account_id: &AccountId) -> Result<(), Error> {
        self.sessions.retain(|_, s| &s.account_id != account_id);
        Ok(())
    }
}
