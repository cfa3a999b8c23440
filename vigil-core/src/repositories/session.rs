//! Repository trait for session records.

use async_trait::async_trait;

use crate::{
    Error,
    account::AccountId,
    session::{Session, SessionToken},
};

/// Storage operations for sessions, keyed by opaque token.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    async fn create(&self, session: Session) -> Result<(), Error>;

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error>;

    /// Remove a session. Idempotent.
    async fn delete(&self, token: &SessionToken) -> Result<(), Error>;

    /// Remove every session bound to an account (admin disable, deletion).
    async fn delete_for_account(&self, account_id: &AccountId) -> Result<(), Error>;
}
