//! Administrative account operations.
//!
//! Each operation is a direct mutation performed on behalf of an already
//! authorized actor; the caller's authorization layer decides *who* may
//! invoke these; this service only records who did.

use std::sync::Arc;

use crate::{
    Error,
    account::{Account, AccountId, AccountStatus, AccountUpdate, Role},
    audit::{Actor, AuditAction, AuditEvent, AuditOutcome},
    clock::Clock,
    error::{AuthError, StorageError},
    repositories::{
        AccountRepository, AccountRepositoryProvider, AuditRepository, AuditRepositoryProvider,
        SessionRepository, SessionRepositoryProvider,
    },
    signals::SignalSource,
    validation::{validate_email, validate_full_name, validate_mobile, validate_password},
};

/// Input for administratively creating an account. Unlike self-registration,
/// the account starts `active` with the chosen role.
#[derive(Debug, Clone)]
pub struct NewAccountInput {
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub role: Role,
}

pub struct AccountService<R>
where
    R: AccountRepositoryProvider + AuditRepositoryProvider + SessionRepositoryProvider,
{
    repositories: Arc<R>,
    signals: Arc<dyn SignalSource>,
    clock: Arc<dyn Clock>,
}

impl<R> AccountService<R>
where
    R: AccountRepositoryProvider + AuditRepositoryProvider + SessionRepositoryProvider,
{
    pub fn new(
        repositories: Arc<R>,
        signals: Arc<dyn SignalSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repositories,
            signals,
            clock,
        }
    }

    pub async fn get(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.repositories.account().find_by_id(id).await
    }

    pub async fn list(&self) -> Result<Vec<Account>, Error> {
        self.repositories.account().list().await
    }

    pub async fn create(&self, actor: &Actor, input: NewAccountInput) -> Result<Account, Error> {
        validate_full_name(&input.full_name)?;
        validate_email(&input.email)?;
        validate_mobile(&input.mobile)?;
        validate_password(&input.password)?;

        if self
            .repositories
            .account()
            .find_by_email(&input.email)
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateEmail.into());
        }

        let account = Account::builder()
            .full_name(input.full_name)
            .email(input.email)
            .mobile(input.mobile)
            .role(input.role)
            .status(AccountStatus::Active)
            .created_at(self.clock.now())
            .build()?;

        let hash = password_auth::generate_hash(&input.password);
        let account = match self.repositories.account().create(account).await {
            Err(Error::Storage(StorageError::Constraint(_))) => {
                return Err(AuthError::DuplicateEmail.into());
            }
            other => other?,
        };
        self.repositories
            .account()
            .set_password_hash(&account.id, &hash)
            .await?;

        self.record(
            actor,
            AuditAction::AccountCreated,
            format!("Created account: {} [{}]", account.email, account.role),
        )
        .await?;

        Ok(account)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: &AccountId,
        update: AccountUpdate,
    ) -> Result<Account, Error> {
        let mut account = self.load(id).await?;

        if let Some(full_name) = update.full_name {
            validate_full_name(&full_name)?;
            account.full_name = full_name;
        }
        if let Some(email) = update.email {
            validate_email(&email)?;
            account.email = email;
        }
        if let Some(mobile) = update.mobile {
            validate_mobile(&mobile)?;
            account.mobile = mobile;
        }
        if let Some(role) = update.role {
            account.role = role;
        }
        if let Some(status) = update.status {
            account.status = status;
        }

        let account = self.repositories.account().update(&account).await?;

        self.record(
            actor,
            AuditAction::AccountUpdated,
            format!("Updated account: {}", account.email),
        )
        .await?;

        Ok(account)
    }

    pub async fn change_role(
        &self,
        actor: &Actor,
        id: &AccountId,
        role: Role,
    ) -> Result<Account, Error> {
        let mut account = self.load(id).await?;
        account.role = role;
        let account = self.repositories.account().update(&account).await?;

        self.record(
            actor,
            AuditAction::RoleChanged,
            format!("{} → {}", account.email, role),
        )
        .await?;

        Ok(account)
    }

    /// Enable or disable an account. Disabling also revokes every live
    /// session for it.
    pub async fn set_enabled(
        &self,
        actor: &Actor,
        id: &AccountId,
        enabled: bool,
    ) -> Result<Account, Error> {
        let mut account = self.load(id).await?;
        account.status = if enabled {
            AccountStatus::Active
        } else {
            AccountStatus::Disabled
        };
        let account = self.repositories.account().update(&account).await?;

        if !enabled {
            self.repositories.session().delete_for_account(id).await?;
        }

        self.record(
            actor,
            AuditAction::StatusChanged,
            format!("{} → {}", account.email, account.status),
        )
        .await?;

        Ok(account)
    }

    /// Clear a lockout and reset the failure counter.
    pub async fn unlock(&self, actor: &Actor, id: &AccountId) -> Result<Account, Error> {
        let mut account = self.load(id).await?;
        account.unlock();
        let account = self.repositories.account().update(&account).await?;

        self.record(
            actor,
            AuditAction::AccountUnlocked,
            format!("{} unlocked by administrator", account.email),
        )
        .await?;

        Ok(account)
    }

    pub async fn delete(&self, actor: &Actor, id: &AccountId) -> Result<(), Error> {
        let account = self.load(id).await?;

        self.repositories.session().delete_for_account(id).await?;
        self.repositories.account().delete(id).await?;

        self.record(
            actor,
            AuditAction::AccountDeleted,
            format!("Deleted: {}", account.email),
        )
        .await?;

        Ok(())
    }

    async fn load(&self, id: &AccountId) -> Result<Account, Error> {
        self.repositories
            .account()
            .find_by_id(id)
            .await?
            .ok_or(Error::Storage(StorageError::NotFound))
    }

    async fn record(&self, actor: &Actor, action: AuditAction, details: String) -> Result<(), Error> {
        let origin = self.signals.current_origin().await;
        self.repositories
            .audit()
            .append(
                AuditEvent::builder()
                    .timestamp(self.clock.now())
                    .account_id(actor.account_id.clone())
                    .email(actor.email.clone())
                    .action(action)
                    .details(details)
                    .ip(origin.ip.clone())
                    .location(origin.location())
                    .outcome(AuditOutcome::Success)
                    .build()?,
            )
            .await
    }
}
