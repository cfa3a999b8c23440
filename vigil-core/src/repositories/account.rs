//! Repository trait for accounts and their credential hashes.

use async_trait::async_trait;

use crate::{
    Error,
    account::{Account, AccountId},
};

/// Storage operations for accounts.
///
/// Email uniqueness is a storage-level constraint: `create` must reject a
/// duplicate email atomically (unique index or equivalent), returning
/// `StorageError::Constraint`, so that two concurrent registrations cannot
/// both succeed.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Insert a new account. Fails with `StorageError::Constraint` if the
    /// email is already taken.
    async fn create(&self, account: Account) -> Result<Account, Error>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error>;

    /// Replace the stored account. Fails with `StorageError::NotFound` if
    /// the account no longer exists.
    async fn update(&self, account: &Account) -> Result<Account, Error>;

    async fn delete(&self, id: &AccountId) -> Result<(), Error>;

    async fn list(&self) -> Result<Vec<Account>, Error>;

    /// Store the password hash for an account. The hash is opaque to storage.
    async fn set_password_hash(&self, id: &AccountId, hash: &str) -> Result<(), Error>;

    async fn password_hash(&self, id: &AccountId) -> Result<Option<String>, Error>;
}
