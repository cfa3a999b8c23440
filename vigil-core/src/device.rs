//! Device records and trust state.
//!
//! One device row exists per unique (account, fingerprint) pair. The
//! fingerprint and posture snapshot are supplied by the client and are an
//! untrusted signal; the engine scores them but never assumes they are
//! tamper-proof.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    account::AccountId,
    id::{generate_prefixed_id, validate_prefixed_id},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: &str) -> Self {
        DeviceId(id.to_string())
    }

    pub fn new_random() -> Self {
        DeviceId(generate_prefixed_id("dev"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "dev")
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Security-hygiene snapshot of a device, captured once at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePosture {
    pub os_updated: bool,
    pub antivirus_present: bool,
    pub disk_encrypted: bool,
    pub screen_lock_enabled: bool,
}

impl DevicePosture {
    /// A posture with every hygiene attribute in good standing.
    pub fn healthy() -> Self {
        Self {
            os_updated: true,
            antivirus_present: true,
            disk_encrypted: true,
            screen_lock_enabled: true,
        }
    }
}

/// Client-supplied attestation of the device identity and posture for one
/// authentication attempt. This crosses a trust boundary: the caller relays
/// whatever the client claims, and the risk scorer treats it as a signal,
/// not a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAttestation {
    /// Stable client-derived identifier for the device/browser.
    pub fingerprint: String,
    pub posture: DevicePosture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub account_id: AccountId,
    pub fingerprint: String,
    pub user_agent: String,
    pub os: String,
    pub browser: String,
    pub approved: bool,
    pub approved_by: Option<AccountId>,
    pub posture: DevicePosture,
    pub first_seen_at: DateTime<Utc>,
}

/// Input for registering a device the first time its fingerprint is seen.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub account_id: AccountId,
    pub fingerprint: String,
    pub user_agent: String,
    pub os: String,
    pub browser: String,
    pub posture: DevicePosture,
    pub first_seen_at: DateTime<Utc>,
}

impl NewDevice {
    /// Materialize an unapproved device row. The posture is captured here and
    /// not re-sampled on later sightings.
    pub fn into_device(self) -> Device {
        Device {
            id: DeviceId::new_random(),
            account_id: self.account_id,
            fingerprint: self.fingerprint,
            user_agent: self.user_agent,
            os: self.os,
            browser: self.browser,
            approved: false,
            approved_by: None,
            posture: self.posture,
            first_seen_at: self.first_seen_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_prefixed() {
        let id = DeviceId::new_random();
        assert!(id.as_str().starts_with("dev_"));
        assert!(id.is_valid());
    }

    #[test]
    fn test_new_device_starts_unapproved() {
        let new_device = NewDevice {
            account_id: AccountId::new_random(),
            fingerprint: "fp_abc123".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            os: "Linux".to_string(),
            browser: "Firefox".to_string(),
            posture: DevicePosture::healthy(),
            first_seen_at: Utc::now(),
        };

        let device = new_device.into_device();
        assert!(!device.approved);
        assert!(device.approved_by.is_none());
        assert_eq!(device.fingerprint, "fp_abc123");
    }
}
