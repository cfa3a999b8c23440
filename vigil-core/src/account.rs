//! Account management
//!
//! The account is the anchor of the authentication state machine. Its status
//! moves `pending_verification → active ⇄ locked`, with `disabled` reachable
//! only through administrative action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};

/// A unique, stable identifier for an account.
/// Treat as opaque; the prefix only aids debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Self {
        AccountId(generate_prefixed_id("acct"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "acct")
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    It,
    Admin,
    SuperAdmin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::It => write!(f, "IT"),
            Role::Admin => write!(f, "ADMIN"),
            Role::SuperAdmin => write!(f, "SUPERADMIN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    PendingVerification,
    Disabled,
    Locked,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::PendingVerification => write!(f, "pending_verification"),
            AccountStatus::Disabled => write!(f, "disabled"),
            AccountStatus::Locked => write!(f, "locked"),
        }
    }
}

/// Representation of an account in vigil.
///
/// Invariant: `status == Locked` implies `locked_until` is set. The failed
/// attempt counter resets to zero on any successful credential check or
/// administrative unlock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub status: AccountStatus,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn builder() -> AccountBuilder {
        AccountBuilder::default()
    }

    /// True if the account is locked and the lockout has not yet expired.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AccountStatus::Locked
            && self.locked_until.is_some_and(|until| now < until)
    }

    /// Clear the lockout state and failed-attempt counter.
    pub fn unlock(&mut self) {
        self.status = AccountStatus::Active;
        self.failed_attempts = 0;
        self.locked_until = None;
    }
}

#[derive(Default)]
pub struct AccountBuilder {
    id: Option<AccountId>,
    full_name: Option<String>,
    email: Option<String>,
    mobile: Option<String>,
    role: Option<Role>,
    status: Option<AccountStatus>,
    created_at: Option<DateTime<Utc>>,
}

impl AccountBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn full_name(mut self, full_name: String) -> Self {
        self.full_name = Some(full_name);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn mobile(mut self, mobile: String) -> Self {
        self.mobile = Some(mobile);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn build(self) -> Result<Account, Error> {
        Ok(Account {
            id: self.id.unwrap_or_default(),
            full_name: self.full_name.ok_or(ValidationError::MissingField(
                "Full name is required".to_string(),
            ))?,
            email: self.email.ok_or(ValidationError::MissingField(
                "Email is required".to_string(),
            ))?,
            mobile: self.mobile.ok_or(ValidationError::MissingField(
                "Mobile number is required".to_string(),
            ))?,
            role: self.role.unwrap_or(Role::User),
            status: self.status.unwrap_or(AccountStatus::PendingVerification),
            failed_attempts: 0,
            locked_until: None,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Fields an administrator may change on an existing account.
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_account() -> Account {
        Account::builder()
            .full_name("Test User".to_string())
            .email("test@example.com".to_string())
            .mobile("+1234567890".to_string())
            .build()
            .unwrap()
    }

    #[test]
    fn test_account_id_prefixed() {
        let id = AccountId::new_random();
        assert!(id.as_str().starts_with("acct_"));
        assert!(id.is_valid());

        let other = AccountId::new_random();
        assert_ne!(id, other);

        assert!(!AccountId::new("invalid").is_valid());
    }

    #[test]
    fn test_builder_defaults() {
        let account = test_account();
        assert_eq!(account.role, Role::User);
        assert_eq!(account.status, AccountStatus::PendingVerification);
        assert_eq!(account.failed_attempts, 0);
        assert!(account.locked_until.is_none());
    }

    #[test]
    fn test_builder_requires_email() {
        let result = Account::builder()
            .full_name("No Email".to_string())
            .mobile("+1234567890".to_string())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_is_locked_at() {
        let now = Utc::now();
        let mut account = test_account();
        assert!(!account.is_locked_at(now));

        account.status = AccountStatus::Locked;
        account.locked_until = Some(now + Duration::minutes(15));
        assert!(account.is_locked_at(now));
        assert!(!account.is_locked_at(now + Duration::minutes(16)));

        account.unlock();
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.failed_attempts, 0);
        assert!(account.locked_until.is_none());
    }
}
