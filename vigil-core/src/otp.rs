//! One-time passcode challenges.
//!
//! At most one challenge is active per (account, purpose) pair; issuing a new
//! one supersedes the prior. A challenge dies on successful verification, on
//! attempt-limit exhaustion, or on expiry, whichever comes first.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    Login,
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpPurpose::Registration => write!(f, "registration"),
            OtpPurpose::Login => write!(f, "login"),
        }
    }
}

/// Where the code is delivered. `Both` sends to email and mobile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpChannel {
    Email,
    Mobile,
    Both,
}

impl std::fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpChannel::Email => write!(f, "email"),
            OtpChannel::Mobile => write!(f, "mobile"),
            OtpChannel::Both => write!(f, "email & mobile"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub account_id: AccountId,
    pub purpose: OtpPurpose,
    pub code: String,
    pub channel: OtpChannel,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

impl OtpChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Generate a 6-digit numeric code, uniformly drawn from 100000..=999999.
pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..=999_999);
    code.to_string()
}
