//! Append-only audit events.
//!
//! Every step of an authentication attempt and every administrative mutation
//! produces one event. The schema is fixed and versioned: a closed set of
//! action tags rather than an open-ended detail object, so downstream
//! consumers can match on kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountId},
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};

/// Current audit schema version. Bump when fields or tags change meaning.
pub const AUDIT_SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AuditEventId(String);

impl AuditEventId {
    pub fn new_random() -> Self {
        AuditEventId(generate_prefixed_id("evt"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "evt")
    }
}

impl Default for AuditEventId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl std::fmt::Display for AuditEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Register,
    OtpSent,
    OtpFailed,
    OtpVerified,
    LoginFailed,
    LoginSuccess,
    AccountLocked,
    AccountUnlocked,
    AccountCreated,
    AccountUpdated,
    AccountDeleted,
    RoleChanged,
    StatusChanged,
    NewDevice,
    DeviceApproved,
    DeviceDenied,
    DeviceApprovalRequested,
    RiskEvaluated,
    PolicyDecision,
    AccessBlocked,
    Logout,
}

impl AuditAction {
    pub fn as_tag(&self) -> &'static str {
        match self {
            AuditAction::Register => "REGISTER",
            AuditAction::OtpSent => "OTP_SENT",
            AuditAction::OtpFailed => "OTP_FAILED",
            AuditAction::OtpVerified => "OTP_VERIFIED",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::LoginSuccess => "LOGIN_SUCCESS",
            AuditAction::AccountLocked => "ACCOUNT_LOCKED",
            AuditAction::AccountUnlocked => "ACCOUNT_UNLOCKED",
            AuditAction::AccountCreated => "ACCOUNT_CREATED",
            AuditAction::AccountUpdated => "ACCOUNT_UPDATED",
            AuditAction::AccountDeleted => "ACCOUNT_DELETED",
            AuditAction::RoleChanged => "ROLE_CHANGED",
            AuditAction::StatusChanged => "STATUS_CHANGED",
            AuditAction::NewDevice => "NEW_DEVICE",
            AuditAction::DeviceApproved => "DEVICE_APPROVED",
            AuditAction::DeviceDenied => "DEVICE_DENIED",
            AuditAction::DeviceApprovalRequested => "DEVICE_APPROVAL_REQUESTED",
            AuditAction::RiskEvaluated => "RISK_EVALUATED",
            AuditAction::PolicyDecision => "POLICY_DECISION",
            AuditAction::AccessBlocked => "ACCESS_BLOCKED",
            AuditAction::Logout => "LOGOUT",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub version: u16,
    pub timestamp: DateTime<Utc>,
    pub account_id: Option<AccountId>,
    pub email: String,
    pub action: AuditAction,
    pub details: String,
    pub risk_score: Option<u8>,
    pub ip: String,
    pub location: String,
    pub outcome: AuditOutcome,
}

impl AuditEvent {
    pub fn builder() -> AuditEventBuilder {
        AuditEventBuilder::default()
    }
}

/// The identity performing an administrative action, recorded on the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub account_id: AccountId,
    pub email: String,
}

impl From<&Account> for Actor {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id.clone(),
            email: account.email.clone(),
        }
    }
}

#[derive(Default)]
pub struct AuditEventBuilder {
    timestamp: Option<DateTime<Utc>>,
    account_id: Option<AccountId>,
    email: Option<String>,
    action: Option<AuditAction>,
    details: Option<String>,
    risk_score: Option<u8>,
    ip: Option<String>,
    location: Option<String>,
    outcome: Option<AuditOutcome>,
}

impl AuditEventBuilder {
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    pub fn risk_score(mut self, risk_score: u8) -> Self {
        self.risk_score = Some(risk_score);
        self
    }

    pub fn ip(mut self, ip: String) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn build(self) -> Result<AuditEvent, Error> {
        Ok(AuditEvent {
            id: AuditEventId::new_random(),
            version: AUDIT_SCHEMA_VERSION,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            account_id: self.account_id,
            email: self.email.ok_or(ValidationError::MissingField(
                "Email is required".to_string(),
            ))?,
            action: self.action.ok_or(ValidationError::MissingField(
                "Action is required".to_string(),
            ))?,
            details: self.details.unwrap_or_default(),
            risk_score: self.risk_score,
            ip: self.ip.unwrap_or_else(|| "0.0.0.0".to_string()),
            location: self.location.unwrap_or_else(|| "Unknown".to_string()),
            outcome: self.outcome.unwrap_or(AuditOutcome::Success),
        })
    }
}
