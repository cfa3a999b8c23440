//! In-memory storage backend for vigil.
//!
//! Backs every repository with `dashmap` keyed maps (and a bounded ring for
//! the audit log). Suitable for tests, demos, and single-process embeddings;
//! nothing survives a restart.

mod account;
mod audit;
mod device;
mod otp;
mod rate_limit;
mod session;

pub use account::MemoryAccountRepository;
pub use audit::MemoryAuditRepository;
pub use device::MemoryDeviceRepository;
pub use otp::MemoryOtpRepository;
pub use rate_limit::MemoryRateLimitRepository;
pub use session::MemorySessionRepository;

use async_trait::async_trait;
use vigil_core::{
    Error,
    repositories::{
        AccountRepositoryProvider, AuditRepositoryProvider, DeviceRepositoryProvider,
        OtpRepositoryProvider, RateLimitRepositoryProvider, RepositoryProvider,
        SessionRepositoryProvider,
    },
};

/// Default number of audit events retained before the oldest are evicted.
pub const DEFAULT_AUDIT_CAPACITY: usize = 500;

pub struct MemoryStorage {
    accounts: MemoryAccountRepository,
    devices: MemoryDeviceRepository,
    otps: MemoryOtpRepository,
    audit: MemoryAuditRepository,
    rates: MemoryRateLimitRepository,
    sessions: MemorySessionRepository,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_audit_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// Create a storage whose audit ring keeps at most `capacity` events.
    pub fn with_audit_capacity(capacity: usize) -> Self {
        Self {
            accounts: MemoryAccountRepository::new(),
            devices: MemoryDeviceRepository::new(),
            otps: MemoryOtpRepository::new(),
            audit: MemoryAuditRepository::new(capacity),
            rates: MemoryRateLimitRepository::new(),
            sessions: MemorySessionRepository::new(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRepositoryProvider for MemoryStorage {
    type AccountRepo = MemoryAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.accounts
    }
}

impl DeviceRepositoryProvider for MemoryStorage {
    type DeviceRepo = MemoryDeviceRepository;

    fn device(&self) -> &Self::DeviceRepo {
        &self.devices
    }
}

impl OtpRepositoryProvider for MemoryStorage {
    type OtpRepo = MemoryOtpRepository;

    fn otp(&self) -> &Self::OtpRepo {
        &self.otps
    }
}

impl AuditRepositoryProvider for MemoryStorage {
    type AuditRepo = MemoryAuditRepository;

    fn audit(&self) -> &Self::AuditRepo {
        &self.audit
    }
}

impl RateLimitRepositoryProvider for MemoryStorage {
    type RateLimitRepo = MemoryRateLimitRepository;

    fn rate_limit(&self) -> &Self::RateLimitRepo {
        &self.rates
    }
}

impl SessionRepositoryProvider for MemoryStorage {
    type SessionRepo = MemorySessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.sessions
    }
}

#[async_trait]
impl RepositoryProvider for MemoryStorage {
    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
