//! Repository traits for the data access layer
//!
//! Services interact with storage exclusively through these traits. The
//! engine does not care whether the backend is a document store, a relational
//! table, or an in-memory map, only that each repository honors the keying
//! and atomicity documented on its trait.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits

pub mod account;
pub mod audit;
pub mod device;
pub mod otp;
pub mod rate_limit;
pub mod session;

pub use account::AccountRepository;
pub use audit::AuditRepository;
pub use device::DeviceRepository;
pub use otp::OtpRepository;
pub use rate_limit::RateLimitRepository;
pub use session::SessionRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for account repository access.
pub trait AccountRepositoryProvider: Send + Sync + 'static {
    type AccountRepo: AccountRepository;

    fn account(&self) -> &Self::AccountRepo;
}

/// Provider trait for device repository access.
pub trait DeviceRepositoryProvider: Send + Sync + 'static {
    type DeviceRepo: DeviceRepository;

    fn device(&self) -> &Self::DeviceRepo;
}

/// Provider trait for OTP challenge repository access.
pub trait OtpRepositoryProvider: Send + Sync + 'static {
    type OtpRepo: OtpRepository;

    fn otp(&self) -> &Self::OtpRepo;
}

/// Provider trait for audit repository access.
pub trait AuditRepositoryProvider: Send + Sync + 'static {
    type AuditRepo: AuditRepository;

    fn audit(&self) -> &Self::AuditRepo;
}

/// Provider trait for rate-window repository access.
pub trait RateLimitRepositoryProvider: Send + Sync + 'static {
    type RateLimitRepo: RateLimitRepository;

    fn rate_limit(&self) -> &Self::RateLimitRepo;
}

/// Provider trait for session repository access.
pub trait SessionRepositoryProvider: Send + Sync + 'static {
    type SessionRepo: SessionRepository;

    fn session(&self) -> &Self::SessionRepo;
}

/// Provider trait that storage implementations must implement to provide all
/// repositories, plus a lifecycle health check.
#[async_trait]
pub trait RepositoryProvider:
    AccountRepositoryProvider
    + DeviceRepositoryProvider
    + OtpRepositoryProvider
    + AuditRepositoryProvider
    + RateLimitRepositoryProvider
    + SessionRepositoryProvider
{
    /// Health check for all repositories.
    async fn health_check(&self) -> Result<(), Error>;
}
