//! The authentication state machine.
//!
//! Orchestrates the full attempt: credentials → one-time passcode → device
//! trust → risk-based policy decision, emitting audit events at every step.
//! There is no ambient session state; each operation takes or returns
//! explicit context values ([`PendingAuth`], [`SessionContext`]).

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountId, AccountStatus},
    audit::{AuditAction, AuditEvent, AuditOutcome},
    clock::Clock,
    device::DeviceAttestation,
    error::{AuthError, OtpError, StorageError},
    lock::KeyedLock,
    notify::NotificationSink,
    otp::{OtpChallenge, OtpChannel, OtpPurpose},
    policy::{self, PolicyDecision, PolicyResult},
    repositories::{AccountRepository, DeviceRepository, RepositoryProvider, SessionRepository},
    services::{
        account::AccountService,
        audit::AuditService,
        device::DeviceService,
        otp::{OtpConfig, OtpService},
        rate_limit::{RateLimitConfig, RateLimitService},
    },
    session::{Session, SessionContext, SessionToken},
    signals::{SignalSnapshot, SignalSource},
    validation::{validate_email, validate_full_name, validate_mobile, validate_password},
};

/// Tunable policy knobs for the state machine.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Consecutive credential failures that trigger a lockout.
    pub max_failed_logins: u32,
    /// How long a lockout lasts.
    pub lockout_period: Duration,
    /// Session lifetime once policy admits the attempt.
    pub session_ttl: Duration,
    pub otp: OtpConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_failed_logins: 5,
            lockout_period: Duration::minutes(15),
            session_ttl: Duration::hours(8),
            otp: OtpConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Input for self-registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

/// The explicit in-between state of an attempt that has passed its first
/// factor and still owes a passcode. The caller holds this value between
/// calls; the engine keeps no ambient copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuth {
    pub account_id: AccountId,
    pub purpose: OtpPurpose,
    pub email: String,
    pub mobile: String,
}

/// Outcome of a successful passcode verification.
///
/// `Blocked` is not an error: authentication itself succeeded, but the risk
/// policy refused the session. The caller gets the full [`PolicyResult`] for
/// its access-denied view.
#[derive(Debug)]
pub enum VerifyOutcome {
    Granted(Box<SessionContext>),
    Blocked(PolicyResult),
}

pub struct AuthService<R: RepositoryProvider> {
    repositories: Arc<R>,
    accounts: AccountService<R>,
    devices: DeviceService<R>,
    otp: OtpService<R>,
    rate_limit: RateLimitService<R>,
    audit: AuditService<R>,
    signals: Arc<dyn SignalSource>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    login_locks: KeyedLock<String>,
}

impl<R: RepositoryProvider> AuthService<R> {
    pub fn new(
        repositories: Arc<R>,
        signals: Arc<dyn SignalSource>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            accounts: AccountService::new(
                repositories.clone(),
                signals.clone(),
                clock.clone(),
            ),
            devices: DeviceService::new(repositories.clone(), signals.clone(), clock.clone()),
            otp: OtpService::new(repositories.clone(), clock.clone(), config.otp.clone()),
            rate_limit: RateLimitService::new(
                repositories.clone(),
                clock.clone(),
                config.rate_limit.clone(),
            ),
            audit: AuditService::new(repositories.clone()),
            repositories,
            signals,
            notifier,
            clock,
            config,
            login_locks: KeyedLock::new(),
        }
    }

    /// Administrative account operations.
    pub fn accounts(&self) -> &AccountService<R> {
        &self.accounts
    }

    /// Device registry operations.
    pub fn devices(&self) -> &DeviceService<R> {
        &self.devices
    }

    /// Audit log access.
    pub fn audit(&self) -> &AuditService<R> {
        &self.audit
    }

    /// Create an account in `pending_verification` and issue a registration
    /// passcode on both channels. Fails `DuplicateEmail` before any state
    /// change if the email is taken; no passcode is issued for a rejected
    /// attempt.
    pub async fn register(&self, request: RegisterRequest) -> Result<PendingAuth, Error> {
        validate_full_name(&request.full_name)?;
        validate_email(&request.email)?;
        validate_mobile(&request.mobile)?;
        validate_password(&request.password)?;

        if self
            .repositories
            .account()
            .find_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateEmail.into());
        }

        let account = Account::builder()
            .full_name(request.full_name)
            .email(request.email)
            .mobile(request.mobile)
            .status(AccountStatus::PendingVerification)
            .created_at(self.clock.now())
            .build()?;

        let hash = password_auth::generate_hash(&request.password);
        let account = match self.repositories.account().create(account).await {
            // The unique-email constraint closes the check-then-create race.
            Err(Error::Storage(StorageError::Constraint(_))) => {
                return Err(AuthError::DuplicateEmail.into());
            }
            other => other?,
        };
        self.repositories
            .account()
            .set_password_hash(&account.id, &hash)
            .await?;

        self.record_for(&account, AuditAction::Register, "New account registration".to_string(), AuditOutcome::Success, None)
            .await?;

        let challenge = self
            .otp
            .issue(&account.id, OtpPurpose::Registration, OtpChannel::Both)
            .await?;
        self.deliver(&account.email, &account.mobile, &challenge).await;
        self.record_for(
            &account,
            AuditAction::OtpSent,
            "Registration code sent to email & mobile".to_string(),
            AuditOutcome::Success,
            None,
        )
        .await?;

        Ok(PendingAuth {
            account_id: account.id,
            purpose: OtpPurpose::Registration,
            email: account.email,
            mobile: account.mobile,
        })
    }

    /// Check credentials and move the attempt to the passcode stage.
    ///
    /// Rate-limited per email. An unknown email fails with the same
    /// `InvalidCredentials` as a wrong password, so account existence does not leak.
    /// On success the failure counter resets and the caller must choose a
    /// delivery channel next; no passcode is issued yet.
    pub async fn login(&self, email: &str, password: &str) -> Result<PendingAuth, Error> {
        self.rate_limit
            .check_and_record(&format!("login:{email}"))
            .await?;

        // Serialize per account so two parallel wrong-password attempts
        // cannot both read the same counter value.
        let _guard = self.login_locks.acquire(email.to_string()).await;

        let Some(mut account) = self.repositories.account().find_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials {
                remaining_attempts: None,
            }
            .into());
        };

        let now = self.clock.now();
        if account.status == AccountStatus::Locked {
            if let Some(until) = account.locked_until {
                if now < until {
                    let remaining_secs = (until - now).num_seconds().max(1);
                    return Err(AuthError::AccountLocked {
                        retry_after_minutes: (remaining_secs + 59) / 60,
                    }
                    .into());
                }
            }
            // Lockout elapsed: auto-unlock before further checks.
            account.unlock();
            account = self.repositories.account().update(&account).await?;
            tracing::info!(email = email, "lockout expired, account auto-unlocked");
        }

        let hash = self
            .repositories
            .account()
            .password_hash(&account.id)
            .await?;
        let password_ok =
            hash.is_some_and(|h| password_auth::verify_password(password, &h).is_ok());

        if !password_ok {
            return Err(self.handle_failed_password(account).await?);
        }

        if account.status == AccountStatus::Disabled {
            return Err(AuthError::AccountDisabled.into());
        }
        if account.status == AccountStatus::PendingVerification {
            return Err(AuthError::NotVerified.into());
        }

        if account.failed_attempts != 0 {
            account.failed_attempts = 0;
            account = self.repositories.account().update(&account).await?;
        }

        tracing::debug!(email = email, "credentials verified, awaiting channel choice");

        Ok(PendingAuth {
            account_id: account.id,
            purpose: OtpPurpose::Login,
            email: account.email,
            mobile: account.mobile,
        })
    }

    /// Issue the login passcode on the channel the user chose.
    pub async fn send_login_otp(
        &self,
        pending: &PendingAuth,
        channel: OtpChannel,
    ) -> Result<(), Error> {
        if pending.purpose != OtpPurpose::Login {
            return Err(crate::error::ValidationError::InvalidField(
                "Pending context is not a login".to_string(),
            )
            .into());
        }

        let challenge = self
            .otp
            .issue(&pending.account_id, OtpPurpose::Login, channel)
            .await?;
        self.deliver(&pending.email, &pending.mobile, &challenge).await;

        let destination = match channel {
            OtpChannel::Email => &pending.email,
            OtpChannel::Mobile => &pending.mobile,
            OtpChannel::Both => &pending.email,
        };
        self.record_pending(
            pending,
            AuditAction::OtpSent,
            format!("Login code sent via {channel} to {destination}"),
            AuditOutcome::Success,
        )
        .await?;

        Ok(())
    }

    /// Replace the active passcode, reusing the previously chosen channel
    /// and resetting the attempt counter.
    pub async fn resend_otp(&self, pending: &PendingAuth) -> Result<(), Error> {
        let challenge = self
            .otp
            .resend(&pending.account_id, pending.purpose)
            .await?;
        self.deliver(&pending.email, &pending.mobile, &challenge).await;

        self.record_pending(
            pending,
            AuditAction::OtpSent,
            format!("Code re-sent via {}", challenge.channel),
            AuditOutcome::Success,
        )
        .await?;

        Ok(())
    }

    /// Verify the submitted passcode and run the zero-trust check.
    ///
    /// On success the device is resolved (registered on first sighting),
    /// signals are collected, the risk score and policy decision are
    /// computed, and either a session is established or the distinguished
    /// `Blocked` outcome is returned with the [`PolicyResult`] for display.
    pub async fn verify_otp(
        &self,
        pending: &PendingAuth,
        code: &str,
        attestation: &DeviceAttestation,
    ) -> Result<VerifyOutcome, Error> {
        let mut account = self
            .repositories
            .account()
            .find_by_id(&pending.account_id)
            .await?
            .ok_or(Error::Storage(StorageError::NotFound))?;

        let challenge = match self.otp.verify(&pending.account_id, pending.purpose, code).await {
            Ok(challenge) => challenge,
            Err(err) => {
                if let Error::Otp(OtpError::Mismatch { remaining_attempts }) = &err {
                    let attempt = self.config.otp.max_attempts - remaining_attempts;
                    self.record_for(
                        &account,
                        AuditAction::OtpFailed,
                        format!(
                            "Invalid code (attempt {attempt}/{})",
                            self.config.otp.max_attempts
                        ),
                        AuditOutcome::Failure,
                        None,
                    )
                    .await?;
                }
                return Err(err);
            }
        };

        if pending.purpose == OtpPurpose::Registration {
            account.status = AccountStatus::Active;
            account = self.repositories.account().update(&account).await?;
        }

        let client = self.signals.current_client().await;
        let (device, _created) = self
            .devices
            .register_if_absent(&account, &client, attestation)
            .await?;

        let origin = self.signals.current_origin().await;
        let now = self.clock.now();
        let snapshot = SignalSnapshot {
            origin: origin.clone(),
            client,
            login_time: now,
            failed_attempts: account.failed_attempts,
            device_approved: device.approved,
            posture: device.posture,
        };
        let result = policy::evaluate(snapshot);

        self.record_for(
            &account,
            AuditAction::OtpVerified,
            format!("Code verified via {}", challenge.channel),
            AuditOutcome::Success,
            Some(result.risk_score),
        )
        .await?;

        self.record_for(
            &account,
            AuditAction::RiskEvaluated,
            format!(
                "Signals: IP={}, ISP={}, Device={}, Posture: OS={}, AV={}, Encrypted={}",
                origin.ip,
                origin.isp,
                if device.approved { "Trusted" } else { "Untrusted" },
                device.posture.os_updated,
                device.posture.antivirus_present,
                device.posture.disk_encrypted,
            ),
            AuditOutcome::Success,
            Some(result.risk_score),
        )
        .await?;

        let reasons = if result.reasons.is_empty() {
            "No risk factors".to_string()
        } else {
            result.reasons.join("; ")
        };
        let blocked = result.decision == PolicyDecision::Block;
        self.record_for(
            &account,
            AuditAction::PolicyDecision,
            format!(
                "Decision: {} | Risk: {}/100 | {reasons}",
                result.decision, result.risk_score
            ),
            if blocked {
                AuditOutcome::Blocked
            } else {
                AuditOutcome::Success
            },
            Some(result.risk_score),
        )
        .await?;

        if blocked {
            self.record_for(
                &account,
                AuditAction::AccessBlocked,
                format!("Access denied: {}", result.reasons.join(", ")),
                AuditOutcome::Blocked,
                Some(result.risk_score),
            )
            .await?;
            return Ok(VerifyOutcome::Blocked(result));
        }

        let session = Session {
            token: SessionToken::new_random(),
            account_id: account.id.clone(),
            device_id: device.id.clone(),
            policy: result,
            created_at: now,
            expires_at: now + self.config.session_ttl,
        };
        self.repositories.session().create(session.clone()).await?;

        self.record_for(
            &account,
            AuditAction::LoginSuccess,
            format!(
                "Login from {}/{} | session established",
                device.browser, device.os
            ),
            AuditOutcome::Success,
            Some(session.policy.risk_score),
        )
        .await?;

        Ok(VerifyOutcome::Granted(Box::new(SessionContext {
            session,
            account,
            device,
        })))
    }

    /// Tear down the session and record the logout.
    pub async fn logout(&self, context: &SessionContext) -> Result<(), Error> {
        self.repositories
            .session()
            .delete(&context.session.token)
            .await?;

        self.record_for(
            &context.account,
            AuditAction::Logout,
            "User logged out".to_string(),
            AuditOutcome::Success,
            None,
        )
        .await?;

        Ok(())
    }

    /// Resolve a persisted session token back into a context.
    ///
    /// Returns `None` for unknown or expired tokens, for accounts that are
    /// no longer active, and for devices that were denied since the session
    /// was created. All of these force re-authentication.
    pub async fn restore_session(
        &self,
        token: &SessionToken,
    ) -> Result<Option<SessionContext>, Error> {
        let Some(session) = self.repositories.session().find_by_token(token).await? else {
            return Ok(None);
        };

        if session.is_expired(self.clock.now()) {
            self.repositories.session().delete(token).await?;
            return Ok(None);
        }

        let Some(account) = self
            .repositories
            .account()
            .find_by_id(&session.account_id)
            .await?
        else {
            return Ok(None);
        };
        if account.status != AccountStatus::Active {
            return Ok(None);
        }

        let Some(device) = self
            .repositories
            .device()
            .find_by_id(&session.device_id)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(SessionContext {
            session,
            account,
            device,
        }))
    }

    async fn handle_failed_password(&self, mut account: Account) -> Result<Error, Error> {
        account.failed_attempts += 1;
        let attempts = account.failed_attempts;
        let max = self.config.max_failed_logins;

        self.record_for(
            &account,
            AuditAction::LoginFailed,
            format!("Invalid password (attempt {attempts}/{max})"),
            AuditOutcome::Failure,
            None,
        )
        .await?;

        if attempts >= max {
            let now = self.clock.now();
            account.status = AccountStatus::Locked;
            account.locked_until = Some(now + self.config.lockout_period);
            self.repositories.account().update(&account).await?;

            self.record_for(
                &account,
                AuditAction::AccountLocked,
                format!("Account locked after {max} failed attempts"),
                AuditOutcome::Blocked,
                None,
            )
            .await?;

            return Ok(AuthError::AccountLocked {
                retry_after_minutes: self.config.lockout_period.num_minutes(),
            }
            .into());
        }

        self.repositories.account().update(&account).await?;
        Ok(AuthError::InvalidCredentials {
            remaining_attempts: Some(max - attempts),
        }
        .into())
    }

    async fn deliver(&self, email: &str, mobile: &str, challenge: &OtpChallenge) {
        match challenge.channel {
            OtpChannel::Email => {
                self.notifier
                    .deliver(email, &challenge.code, challenge.purpose, challenge.channel)
                    .await;
            }
            OtpChannel::Mobile => {
                self.notifier
                    .deliver(mobile, &challenge.code, challenge.purpose, challenge.channel)
                    .await;
            }
            OtpChannel::Both => {
                self.notifier
                    .deliver(email, &challenge.code, challenge.purpose, OtpChannel::Email)
                    .await;
                self.notifier
                    .deliver(mobile, &challenge.code, challenge.purpose, OtpChannel::Mobile)
                    .await;
            }
        }
    }

    async fn record_for(
        &self,
        account: &Account,
        action: AuditAction,
        details: String,
        outcome: AuditOutcome,
        risk_score: Option<u8>,
    ) -> Result<(), Error> {
        let origin = self.signals.current_origin().await;
        let mut builder = AuditEvent::builder()
            .timestamp(self.clock.now())
            .account_id(account.id.clone())
            .email(account.email.clone())
            .action(action)
            .details(details)
            .ip(origin.ip.clone())
            .location(origin.location())
            .outcome(outcome);
        if let Some(score) = risk_score {
            builder = builder.risk_score(score);
        }
        self.audit.record(builder.build()?).await
    }

    async fn record_pending(
        &self,
        pending: &PendingAuth,
        action: AuditAction,
        details: String,
        outcome: AuditOutcome,
    ) -> Result<(), Error> {
        let origin = self.signals.current_origin().await;
        self.audit
            .record(
                AuditEvent::builder()
                    .timestamp(self.clock.now())
                    .account_id(pending.account_id.clone())
                    .email(pending.email.clone())
                    .action(action)
                    .details(details)
                    .ip(origin.ip.clone())
                    .location(origin.location())
                    .outcome(outcome)
                    .build()?,
            )
            .await
    }
}
