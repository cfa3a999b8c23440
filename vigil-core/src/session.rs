//! Session state.
//!
//! Sessions are opaque tokens bound to an account and a device. There is no
//! ambient "current session": every state-machine operation takes or returns
//! an explicit [`SessionContext`] value, and persistence goes through the
//! session repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    account::{Account, AccountId},
    device::{Device, DeviceId},
    id::generate_random_string,
    policy::PolicyResult,
};

/// An opaque session token with at least 256 bits of entropy, used for
/// lookups in the session store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    pub fn new_random() -> Self {
        SessionToken(generate_random_string(32))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The persisted session record. Carries the policy result that admitted it
/// so the caller can render the last-known risk context after a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub account_id: AccountId,
    pub device_id: DeviceId,
    pub policy: PolicyResult,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A fully resolved, authenticated context: the session plus fresh copies of
/// the account and device it is bound to. Built by `verify_otp` on success
/// and by `restore_session`; never stored as-is.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Session,
    pub account: Account,
    pub device: Device,
}

impl SessionContext {
    pub fn policy(&self) -> &PolicyResult {
        &self.session.policy
    }
}
