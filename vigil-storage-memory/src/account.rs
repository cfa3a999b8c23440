use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use vigil_core::{
    Account, AccountId, Error,
    error::StorageError,
    repositories::AccountRepository,
};

/// Accounts keyed by id, with a unique email index and a side table for
/// credential hashes.
///
/// Lock order: email index before the account map. The index entry is held
/// across the account insert so a duplicate email can never win the race.
pub struct MemoryAccountRepository {
    accounts: DashMap<AccountId, Account>,
    by_email: DashMap<String, AccountId>,
    password_hashes: DashMap<AccountId, String>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            by_email: DashMap::new(),
            password_hashes: DashMap::new(),
        }
    }
}

impl Default for MemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, Error> {
        match self.by_email.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(Error::Storage(StorageError::Constraint(format!(
                "email already registered: {}",
                account.email
            )))),
            Entry::Vacant(entry) => {
                self.accounts.insert(account.id.clone(), account.clone());
                entry.insert(account.id.clone());
                Ok(account)
            }
        }
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        Ok(self.accounts.get(id).map(|a| a.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let Some(id) = self.by_email.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn update(&self, account: &Account) -> Result<Account, Error> {
        let previous_email = self
            .accounts
            .get(&account.id)
            .map(|a| a.email.clone())
            .ok_or(Error::Storage(StorageError::NotFound))?;

        if previous_email != account.email {
            match self.by_email.entry(account.email.clone()) {
                Entry::Occupied(_) => {
                    return Err(Error::Storage(StorageError::Constraint(format!(
                        "email already registered: {}",
                        account.email
                    ))));
                }
                Entry::Vacant(entry) => {
                    entry.insert(account.id.clone());
                }
            }
            self.by_email.remove(&previous_email);
        }

        self.accounts.insert(account.id.clone(), account.clone());
        Ok(account.clone())
    }

    async fn delete(&self, id: &AccountId) -> Result<(), Error> {
        if let Some((_, account)) = self.accounts.remove(id) {
            self.by_email.remove(&account.email);
        }
        self.password_hashes.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Account>, Error> {
        Ok(self.accounts.iter().map(|a| a.clone()).collect())
    }

    async fn set_password_hash(&self, id: &AccountId, hash: &str) -> Result<(), Error> {
        self.password_hashes.insert(id.clone(), hash.to_string());
        Ok(())
    }

    async fn password_hash(&self, id: &AccountId) -> Result<Option<String>, Error> {
        Ok(self.password_hashes.get(id).map(|h| h.clone()))
    }
}
